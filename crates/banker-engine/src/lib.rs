//! Banker Engine -- session driver for deadlock-avoidance resource accounting.
//!
//! This crate builds on [`banker_core`] to provide the surface a front end
//! talks to: a [`Session`](session::Session) that owns one resource state,
//! journals every request and release through [`banker_journal`], captures
//! hashed snapshots, and records operation logs that can be replayed to
//! check determinism.
//!
//! # Quick Start
//!
//! ```
//! use banker_engine::prelude::*;
//!
//! let mut session = Session::new(SessionConfig::default()).unwrap();
//! session
//!     .load_configuration(
//!         5,
//!         3,
//!         vec![10, 5, 7],
//!         vec![
//!             vec![7, 5, 3],
//!             vec![3, 2, 2],
//!             vec![9, 0, 2],
//!             vec![2, 2, 2],
//!             vec![4, 3, 3],
//!         ],
//!         vec![
//!             vec![0, 1, 0],
//!             vec![2, 0, 0],
//!             vec![3, 0, 2],
//!             vec![2, 1, 1],
//!             vec![0, 0, 2],
//!         ],
//!     )
//!     .unwrap();
//!
//! let report = session.compute_safe_sequence().unwrap();
//! assert_eq!(report.safe_sequence(), Some(&[1, 3, 4, 0, 2][..]));
//!
//! session.request_units(1, 0, 1).unwrap();
//! assert_eq!(session.snapshot().unwrap().available, vec![2, 3, 2]);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod logging;
pub mod replay;
pub mod session;
pub mod snapshot;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the core crate for convenience.
pub use banker_core;

/// Re-export the journal crate for convenience.
pub use banker_journal;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common session usage.
pub mod prelude {
    pub use banker_core::prelude::*;

    pub use crate::config::SessionConfig;
    pub use crate::logging::init_tracing;
    pub use crate::replay::{
        record_operation, replay, DivergenceKind, Operation, OperationLog, ReplayDivergence,
        ReplayEntry, ReplayRecorder, ReplayResult,
    };
    pub use crate::session::{Session, SessionError};
    pub use crate::snapshot::SessionSnapshot;

    pub use banker_journal::journal::{AdjustJournal, EntryOutcome, JournalEntry};
}
