//! Read-only state views and restore.
//!
//! [`StateSnapshot`] is a plain, serializable copy of every vector and matrix
//! of a [`ResourceState`], including the derived `available` and `need`
//! fields, for display and storage. Restoring goes back through the same
//! validation as construction, and additionally rejects a snapshot whose
//! derived fields disagree with its ledger.

use serde::{Deserialize, Serialize};

use crate::state::ResourceState;
use crate::ConfigError;

// ---------------------------------------------------------------------------
// StateSnapshot
// ---------------------------------------------------------------------------

/// Plain copy of a [`ResourceState`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// `R`.
    pub totals: Vec<u32>,
    /// `Avail` (derived).
    pub available: Vec<u32>,
    /// `Max`, one row per process.
    pub max_claims: Vec<Vec<u32>>,
    /// `Alloc`, one row per process.
    pub allocations: Vec<Vec<u32>>,
    /// `Need` (derived), one row per process.
    pub need: Vec<Vec<u32>>,
}

impl StateSnapshot {
    /// Number of processes.
    pub fn process_count(&self) -> usize {
        self.max_claims.len()
    }

    /// Number of resource types.
    pub fn resource_count(&self) -> usize {
        self.totals.len()
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a JSON string produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// ResourceState snapshot/restore impl
// ---------------------------------------------------------------------------

impl ResourceState {
    /// Capture every field, derived ones included.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            totals: self.totals().to_vec(),
            available: self.available().to_vec(),
            max_claims: self.max_claims().to_rows(),
            allocations: self.allocations().to_rows(),
            need: self.need_matrix().to_rows(),
        }
    }

    /// Rebuild a state from a snapshot.
    ///
    /// # Errors
    ///
    /// Any error [`create`](Self::create) would return, or
    /// [`ConfigError::InconsistentSnapshot`] if the snapshot's `available` or
    /// `need` differ from the values its totals, claims and allocations imply.
    pub fn from_snapshot(snapshot: &StateSnapshot) -> Result<Self, ConfigError> {
        let state = Self::create(
            snapshot.process_count(),
            snapshot.resource_count(),
            snapshot.totals.clone(),
            snapshot.max_claims.clone(),
            snapshot.allocations.clone(),
        )?;

        if state.available() != snapshot.available.as_slice() {
            return Err(ConfigError::InconsistentSnapshot { field: "available" });
        }
        if state.need_matrix().to_rows() != snapshot.need {
            return Err(ConfigError::InconsistentSnapshot { field: "need" });
        }
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
