//! Session-level snapshot and restore with BLAKE3 hashing.
//!
//! A [`SessionSnapshot`] pairs the core [`StateSnapshot`] with the session's
//! operation counter and a BLAKE3 digest over both. Restoring verifies the
//! digest first and rebuilds the [`ResourceState`] through
//! [`ResourceState::from_snapshot`], so a corrupted or hand-edited snapshot
//! is rejected before the session is touched.
//!
//! ```
//! use banker_engine::prelude::*;
//!
//! let mut session = Session::new(SessionConfig::default()).unwrap();
//! session
//!     .load_configuration(1, 1, vec![3], vec![vec![3]], vec![vec![0]])
//!     .unwrap();
//!
//! let saved = session.capture_snapshot().unwrap();
//! assert_eq!(saved.hash.len(), 64);
//!
//! session.request_units(0, 0, 2).unwrap();
//! assert_ne!(session.state_hash().unwrap(), saved.hash);
//!
//! session.restore_from_snapshot(&saved).unwrap();
//! assert_eq!(session.state_hash().unwrap(), saved.hash);
//! ```
//!
//! The journal and the last safety trace are not part of a snapshot. Both
//! are cleared on restore.

use banker_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionError};

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// A serializable snapshot of a loaded session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Every vector and matrix of the resource state.
    pub state: StateSnapshot,
    /// Adjust attempts since the configuration was loaded.
    pub operations_applied: u64,
    /// BLAKE3 hex digest (64 lowercase hex chars) of `state` and
    /// `operations_applied`.
    pub hash: String,
}

impl SessionSnapshot {
    /// Recompute the digest and compare it with the recorded one.
    pub fn verify_hash(&self) -> bool {
        compute_hash(&self.state, self.operations_applied) == self.hash
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// BLAKE3 over a length-prefixed little-endian encoding of every field.
fn compute_hash(state: &StateSnapshot, operations_applied: u64) -> String {
    let mut hasher = blake3::Hasher::new();

    hash_vector(&mut hasher, &state.totals);
    hash_vector(&mut hasher, &state.available);
    hash_rows(&mut hasher, &state.max_claims);
    hash_rows(&mut hasher, &state.allocations);
    hash_rows(&mut hasher, &state.need);
    hasher.update(&operations_applied.to_le_bytes());

    hasher.finalize().to_hex().to_string()
}

fn hash_vector(hasher: &mut blake3::Hasher, values: &[u32]) {
    hasher.update(&(values.len() as u64).to_le_bytes());
    for value in values {
        hasher.update(&value.to_le_bytes());
    }
}

fn hash_rows(hasher: &mut blake3::Hasher, rows: &[Vec<u32>]) {
    hasher.update(&(rows.len() as u64).to_le_bytes());
    for row in rows {
        hash_vector(hasher, row);
    }
}

// ---------------------------------------------------------------------------
// Session snapshot/restore methods
// ---------------------------------------------------------------------------

impl Session {
    /// Capture the current state together with its digest.
    pub fn capture_snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let state = self.snapshot()?;
        let operations_applied = self.operations_applied();
        let hash = compute_hash(&state, operations_applied);
        Ok(SessionSnapshot {
            state,
            operations_applied,
            hash,
        })
    }

    /// Digest of the current state, equal to `capture_snapshot()?.hash`.
    pub fn state_hash(&self) -> Result<String, SessionError> {
        Ok(compute_hash(&self.snapshot()?, self.operations_applied()))
    }

    /// Replace the current state with a previously captured snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the digest does not match the snapshot contents
    /// or if the snapshot's derived fields disagree with its ledger. The
    /// session is unchanged on error.
    pub fn restore_from_snapshot(
        &mut self,
        snapshot: &SessionSnapshot,
    ) -> Result<(), anyhow::Error> {
        let expected_hash = compute_hash(&snapshot.state, snapshot.operations_applied);
        if expected_hash != snapshot.hash {
            return Err(anyhow::anyhow!(
                "snapshot hash mismatch: recorded {} but recomputed {expected_hash}",
                snapshot.hash
            ));
        }

        let state = ResourceState::from_snapshot(&snapshot.state)
            .map_err(|e| anyhow::anyhow!("failed to rebuild resource state from snapshot: {e}"))?;

        self.install(state, snapshot.operations_applied);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
