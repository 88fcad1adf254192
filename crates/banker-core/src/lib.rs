//! Banker Core -- multi-unit resource state with deadlock avoidance.
//!
//! This crate holds the resource model for the Banker's algorithm: total
//! units per resource type, per-process maximum claims, and current
//! allocations. Every change to an allocation passes through the
//! [`TransactionManager`](transaction::TransactionManager), which grants a
//! request only if the resulting state is still *safe* according to the
//! [`SafetyEngine`](safety::SafetyEngine). Unsafe requests are rolled back
//! before the call returns.
//!
//! # Quick Start
//!
//! ```
//! use banker_core::prelude::*;
//!
//! let mut state = ResourceState::create(
//!     2,
//!     1,
//!     vec![4],
//!     vec![vec![3], vec![3]],
//!     vec![vec![1], vec![1]],
//! )
//! .unwrap();
//! assert_eq!(state.available(), &[2]);
//!
//! let manager = TransactionManager::new();
//! let outcome = manager.request_units(&mut state, 0, 0, 1).unwrap();
//! assert!(matches!(outcome, AdjustOutcome::Granted { units: 1, .. }));
//!
//! // One more unit to process 1 would leave nobody able to finish.
//! let denied = manager.request_units(&mut state, 1, 0, 1);
//! assert!(matches!(denied, Err(AdjustError::Unsafe { .. })));
//! assert_eq!(state.available(), &[1]);
//! assert_eq!(SafetyEngine::new().check(&state).sequence, vec![0, 1]);
//! ```

#![deny(unsafe_code)]

pub mod matrix;
pub mod safety;
pub mod snapshot;
pub mod state;
pub mod transaction;

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Which index space an [`IndexError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Row index (process).
    Process,
    /// Column index (resource type).
    Resource,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Process => f.write_str("process"),
            Axis::Resource => f.write_str("resource"),
        }
    }
}

/// Errors produced while building a [`ResourceState`](state::ResourceState).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A supplied vector or matrix row has the wrong length for `(n, m)`.
    #[error("dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// An allocation breaks the max-claim or total-units bound.
    #[error("invalid allocation: {0}")]
    InvalidAllocation(AllocationViolation),

    /// A snapshot's derived field does not match what its ledger implies.
    #[error("snapshot field '{field}' disagrees with the allocation ledger")]
    InconsistentSnapshot { field: &'static str },
}

/// The specific bound an invalid allocation breaks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationViolation {
    /// `Alloc[i][j] > Max[i][j]`.
    #[error("process {process} holds {allocated} unit(s) of resource {resource}, above its max claim {max}")]
    ExceedsMaxClaim {
        process: usize,
        resource: usize,
        allocated: u32,
        max: u32,
    },

    /// `sum_i Alloc[i][j] > R[j]`.
    #[error("{allocated} unit(s) of resource {resource} allocated but only {total} exist")]
    ExceedsTotal {
        resource: usize,
        allocated: u64,
        total: u32,
    },
}

/// A process or resource index outside the configured dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{axis} index {index} out of range (len {len})")]
pub struct IndexError {
    pub axis: Axis,
    pub index: usize,
    pub len: usize,
}

/// Errors produced by [`TransactionManager::adjust`](transaction::TransactionManager::adjust).
///
/// Every variant is recoverable. The state is unchanged whenever one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdjustError {
    /// The process or resource index is outside the configured dimensions.
    #[error("process {process} / resource {resource} out of range ({processes} processes, {resources} resources)")]
    OutOfRange {
        /// Target process index.
        process: usize,
        /// Target resource index.
        resource: usize,
        /// Configured process count.
        processes: usize,
        /// Configured resource count.
        resources: usize,
    },

    /// The request is larger than the process's remaining need.
    #[error("process {process} requested {requested} unit(s) of resource {resource} but its remaining need is {need}")]
    ExceedsClaim {
        /// Target process index.
        process: usize,
        /// Target resource index.
        resource: usize,
        /// Units requested.
        requested: u64,
        /// Remaining need before the call.
        need: u32,
    },

    /// The request is larger than the units currently available.
    #[error("process {process} requested {requested} unit(s) of resource {resource} but only {available} are available")]
    ExceedsAvailable {
        /// Target process index.
        process: usize,
        /// Target resource index.
        resource: usize,
        /// Units requested.
        requested: u64,
        /// Units currently available.
        available: u32,
    },

    /// The release is larger than what the process holds.
    #[error("process {process} tried to release {released} unit(s) of resource {resource} but holds {allocated}")]
    ExceedsAllocation {
        /// Target process index.
        process: usize,
        /// Target resource index.
        resource: usize,
        /// Units the caller tried to release.
        released: u64,
        /// Units currently held.
        allocated: u32,
    },

    /// Granting the request would leave the system in an unsafe state.
    #[error("granting {requested} unit(s) of resource {resource} to process {process} would be unsafe")]
    Unsafe {
        /// Target process index.
        process: usize,
        /// Target resource index.
        resource: usize,
        /// Units requested.
        requested: u64,
        /// Remaining need of `process` for `resource` before the call.
        need: u32,
        /// Units of `resource` available before (and after) the denied call.
        available: u32,
        /// Processes the safety scan could finish before it stalled.
        partial_sequence: Vec<usize>,
    },
}

/// Field-free classification of an [`AdjustError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjustErrorKind {
    /// See [`AdjustError::OutOfRange`].
    OutOfRange,
    /// See [`AdjustError::ExceedsClaim`].
    ExceedsClaim,
    /// See [`AdjustError::ExceedsAvailable`].
    ExceedsAvailable,
    /// See [`AdjustError::ExceedsAllocation`].
    ExceedsAllocation,
    /// See [`AdjustError::Unsafe`].
    Unsafe,
}

impl AdjustError {
    /// The classification of this error, without context fields.
    pub fn kind(&self) -> AdjustErrorKind {
        match self {
            AdjustError::OutOfRange { .. } => AdjustErrorKind::OutOfRange,
            AdjustError::ExceedsClaim { .. } => AdjustErrorKind::ExceedsClaim,
            AdjustError::ExceedsAvailable { .. } => AdjustErrorKind::ExceedsAvailable,
            AdjustError::ExceedsAllocation { .. } => AdjustErrorKind::ExceedsAllocation,
            AdjustError::Unsafe { .. } => AdjustErrorKind::Unsafe,
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::matrix::{Matrix, RaggedRow};
    pub use crate::safety::{SafetyEngine, SafetyReport, SafetyStep, SafetyTrace};
    pub use crate::snapshot::StateSnapshot;
    pub use crate::state::{Configuration, ResourceState};
    pub use crate::transaction::{AdjustOutcome, TransactionManager};
    pub use crate::{
        AdjustError, AdjustErrorKind, AllocationViolation, Axis, ConfigError, IndexError,
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
