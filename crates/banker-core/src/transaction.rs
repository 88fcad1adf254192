//! Validated request / release of resource units.
//!
//! [`TransactionManager::adjust`] is the only way to change an allocation
//! after a [`ResourceState`] is built. A positive `delta` requests units, a
//! negative one releases them, and zero is a no-op.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. `process` and `resource` in range, else [`AdjustError::OutOfRange`].
//! 2. Request: `delta <= Need`, else [`AdjustError::ExceedsClaim`];
//!    then `delta <= Avail`, else [`AdjustError::ExceedsAvailable`].
//! 3. Release: `|delta| <= Alloc`, else [`AdjustError::ExceedsAllocation`].
//!
//! A request that passes the bound checks is applied tentatively and the
//! resulting state is scanned by the [`SafetyEngine`]. If the scan reports
//! unsafe, the two touched cells are written back from a [`CellCheckpoint`]
//! and [`AdjustError::Unsafe`] is returned. Releases only ever add to
//! `Avail`, so they are applied without a scan.
//!
//! Every rejected call leaves the state exactly as it was.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::safety::SafetyEngine;
use crate::state::{Cell, ResourceState};
use crate::AdjustError;

// ---------------------------------------------------------------------------
// AdjustOutcome
// ---------------------------------------------------------------------------

/// A successful [`TransactionManager::adjust`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustOutcome {
    /// Units were allocated and the new state is safe.
    Granted {
        process: usize,
        resource: usize,
        units: u32,
        /// Completion order proving the new state is safe.
        sequence: Vec<usize>,
    },
    /// Units were returned to the available pool.
    Released {
        process: usize,
        resource: usize,
        units: u32,
    },
    /// `delta` was zero; nothing changed.
    Unchanged,
}

// ---------------------------------------------------------------------------
// CellCheckpoint
// ---------------------------------------------------------------------------

/// Saved copy of the two cells a tentative grant touches.
#[derive(Debug, Clone, Copy)]
struct CellCheckpoint {
    process: usize,
    resource: usize,
    available: u32,
    allocated: u32,
}

impl CellCheckpoint {
    fn capture(process: usize, resource: usize, cell: Cell) -> Self {
        Self {
            process,
            resource,
            available: cell.available,
            allocated: cell.allocated,
        }
    }

    fn restore(self, state: &mut ResourceState) {
        state.write_cell(self.process, self.resource, self.available, self.allocated);
    }
}

// ---------------------------------------------------------------------------
// TransactionManager
// ---------------------------------------------------------------------------

/// Applies signed unit deltas under safety supervision.
///
/// The manager holds no state of its own; it borrows the [`ResourceState`]
/// for the duration of one call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionManager {
    engine: SafetyEngine,
}

impl TransactionManager {
    /// Create a manager using the default [`SafetyEngine`].
    pub fn new() -> Self {
        Self {
            engine: SafetyEngine::new(),
        }
    }

    /// The safety engine used to validate requests.
    pub fn engine(&self) -> &SafetyEngine {
        &self.engine
    }

    /// Request `count` more units of `resource` for `process`.
    pub fn request_units(
        &self,
        state: &mut ResourceState,
        process: usize,
        resource: usize,
        count: u32,
    ) -> Result<AdjustOutcome, AdjustError> {
        self.adjust(state, process, resource, i64::from(count))
    }

    /// Release `count` held units of `resource` from `process`.
    pub fn release_units(
        &self,
        state: &mut ResourceState,
        process: usize,
        resource: usize,
        count: u32,
    ) -> Result<AdjustOutcome, AdjustError> {
        self.adjust(state, process, resource, -i64::from(count))
    }

    /// Apply `delta` units to `Alloc[process][resource]`.
    ///
    /// See the [module documentation](self) for the check order and rollback
    /// behaviour.
    pub fn adjust(
        &self,
        state: &mut ResourceState,
        process: usize,
        resource: usize,
        delta: i64,
    ) -> Result<AdjustOutcome, AdjustError> {
        let Some(cell) = state.cell(process, resource) else {
            return Err(AdjustError::OutOfRange {
                process,
                resource,
                processes: state.process_count(),
                resources: state.resource_count(),
            });
        };

        match delta {
            0 => Ok(AdjustOutcome::Unchanged),
            d if d > 0 => self.grant(state, process, resource, d.unsigned_abs(), cell),
            d => release(state, process, resource, d.unsigned_abs(), cell),
        }
    }

    fn grant(
        &self,
        state: &mut ResourceState,
        process: usize,
        resource: usize,
        requested: u64,
        cell: Cell,
    ) -> Result<AdjustOutcome, AdjustError> {
        let need = cell.need();
        if requested > u64::from(need) {
            return Err(AdjustError::ExceedsClaim {
                process,
                resource,
                requested,
                need,
            });
        }
        if requested > u64::from(cell.available) {
            return Err(AdjustError::ExceedsAvailable {
                process,
                resource,
                requested,
                available: cell.available,
            });
        }
        // Bounded by `need` above.
        let units = requested as u32;

        let checkpoint = CellCheckpoint::capture(process, resource, cell);
        state.write_cell(
            process,
            resource,
            cell.available - units,
            cell.allocated + units,
        );

        let report = self.engine.check(state);
        if !report.safe {
            checkpoint.restore(state);
            warn!(
                process,
                resource,
                units,
                partial_sequence = ?report.sequence,
                "request denied: resulting state would be unsafe"
            );
            return Err(AdjustError::Unsafe {
                process,
                resource,
                requested,
                need,
                available: cell.available,
                partial_sequence: report.sequence,
            });
        }

        debug!(
            process,
            resource,
            units,
            sequence = ?report.sequence,
            "request granted"
        );
        Ok(AdjustOutcome::Granted {
            process,
            resource,
            units,
            sequence: report.sequence,
        })
    }
}

fn release(
    state: &mut ResourceState,
    process: usize,
    resource: usize,
    released: u64,
    cell: Cell,
) -> Result<AdjustOutcome, AdjustError> {
    if released > u64::from(cell.allocated) {
        return Err(AdjustError::ExceedsAllocation {
            process,
            resource,
            released,
            allocated: cell.allocated,
        });
    }
    // Bounded by `allocated` above.
    let units = released as u32;

    state.write_cell(
        process,
        resource,
        cell.available + units,
        cell.allocated - units,
    );

    debug!(process, resource, units, "units released");
    Ok(AdjustOutcome::Released {
        process,
        resource,
        units,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
