//! The authoritative resource ledger.
//!
//! [`ResourceState`] owns the totals `R`, the derived availability `Avail`,
//! the max-claim matrix `Max`, and the allocation matrix `Alloc`. `Need` is
//! never stored; it is always `Max - Alloc`.
//!
//! A state is built wholesale from a [`Configuration`] (or the equivalent
//! positional arguments to [`ResourceState::create`]) and `Avail` is derived
//! on construction. There is no public mutator: allocations only change via
//! [`TransactionManager`](crate::transaction::TransactionManager).

use serde::{Deserialize, Serialize};

use crate::matrix::Matrix;
use crate::{AllocationViolation, Axis, ConfigError, IndexError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Plain-data description of one claim graph, as supplied by a caller.
///
/// This is the unvalidated input form. Use
/// [`ResourceState::from_configuration`] to turn it into a checked state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Number of processes `n`.
    pub processes: usize,
    /// Number of resource types `m`.
    pub resources: usize,
    /// `R[0..m)`: total units of each resource type.
    pub totals: Vec<u32>,
    /// `Max[i][j]`, `n` rows of `m` entries.
    pub max_claims: Vec<Vec<u32>>,
    /// `Alloc[i][j]`, `n` rows of `m` entries.
    pub allocations: Vec<Vec<u32>>,
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// The three values a single `adjust` call reads for one `(process, resource)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cell {
    pub available: u32,
    pub allocated: u32,
    pub max_claim: u32,
}

impl Cell {
    #[inline]
    pub fn need(self) -> u32 {
        self.max_claim - self.allocated
    }
}

// ---------------------------------------------------------------------------
// ResourceState
// ---------------------------------------------------------------------------

/// Totals, availability, max claims and allocations for `n` processes over
/// `m` resource types.
///
/// Invariants, upheld between every pair of operations:
///
/// - `Avail[j] == R[j] - sum_i Alloc[i][j]`
/// - `Alloc[i][j] <= Max[i][j]`
/// - `sum_i Alloc[i][j] <= R[j]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceState {
    totals: Vec<u32>,
    available: Vec<u32>,
    max_claim: Matrix<u32>,
    allocation: Matrix<u32>,
}

impl ResourceState {
    /// Build a state from positional inputs.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DimensionMismatch`] if `totals` is not `m` long, or
    ///   either matrix is not `n` rows of `m` entries.
    /// - [`ConfigError::InvalidAllocation`] if some `Alloc[i][j] > Max[i][j]`
    ///   or some column of `Alloc` sums past `R[j]`.
    pub fn create(
        processes: usize,
        resources: usize,
        totals: Vec<u32>,
        max_claims: Vec<Vec<u32>>,
        allocations: Vec<Vec<u32>>,
    ) -> Result<Self, ConfigError> {
        expect_len("totals", resources, totals.len())?;
        let max_claim = build_matrix("max_claims", processes, resources, max_claims)?;
        let allocation = build_matrix("allocations", processes, resources, allocations)?;

        let available = derive_available(&totals, &max_claim, &allocation)?;

        tracing::debug!(processes, resources, "resource state created");

        Ok(Self {
            totals,
            available,
            max_claim,
            allocation,
        })
    }

    /// Build a state from a [`Configuration`]. Same checks as [`create`](Self::create).
    pub fn from_configuration(config: Configuration) -> Result<Self, ConfigError> {
        Self::create(
            config.processes,
            config.resources,
            config.totals,
            config.max_claims,
            config.allocations,
        )
    }

    /// The configuration that would rebuild this exact state.
    pub fn to_configuration(&self) -> Configuration {
        Configuration {
            processes: self.process_count(),
            resources: self.resource_count(),
            totals: self.totals.clone(),
            max_claims: self.max_claim.to_rows(),
            allocations: self.allocation.to_rows(),
        }
    }

    /// Number of processes `n`.
    #[inline]
    pub fn process_count(&self) -> usize {
        self.max_claim.row_count()
    }

    /// Number of resource types `m`.
    #[inline]
    pub fn resource_count(&self) -> usize {
        self.totals.len()
    }

    /// `R`: total units per resource type.
    pub fn totals(&self) -> &[u32] {
        &self.totals
    }

    /// `Avail`: units per resource type not held by any process.
    pub fn available(&self) -> &[u32] {
        &self.available
    }

    /// The full `Max` matrix.
    pub fn max_claims(&self) -> &Matrix<u32> {
        &self.max_claim
    }

    /// The full `Alloc` matrix.
    pub fn allocations(&self) -> &Matrix<u32> {
        &self.allocation
    }

    /// Verify that `(process, resource)` addresses a cell.
    pub fn check_index(&self, process: usize, resource: usize) -> Result<(), IndexError> {
        if process >= self.process_count() {
            return Err(IndexError {
                axis: Axis::Process,
                index: process,
                len: self.process_count(),
            });
        }
        if resource >= self.resource_count() {
            return Err(IndexError {
                axis: Axis::Resource,
                index: resource,
                len: self.resource_count(),
            });
        }
        Ok(())
    }

    /// `Max[process][resource]`.
    pub fn max_claim(&self, process: usize, resource: usize) -> Result<u32, IndexError> {
        self.check_index(process, resource)?;
        Ok(self.cell_unchecked(process, resource).max_claim)
    }

    /// `Alloc[process][resource]`.
    pub fn allocation(&self, process: usize, resource: usize) -> Result<u32, IndexError> {
        self.check_index(process, resource)?;
        Ok(self.cell_unchecked(process, resource).allocated)
    }

    /// `Need[process][resource] = Max - Alloc`.
    pub fn need(&self, process: usize, resource: usize) -> Result<u32, IndexError> {
        self.check_index(process, resource)?;
        Ok(self.cell_unchecked(process, resource).need())
    }

    /// The whole `Need` row for one process.
    pub fn need_row(&self, process: usize) -> Result<Vec<u32>, IndexError> {
        match (self.max_claim.row(process), self.allocation.row(process)) {
            (Some(max), Some(held)) => Ok(max.iter().zip(held).map(|(m, a)| m - a).collect()),
            _ => Err(IndexError {
                axis: Axis::Process,
                index: process,
                len: self.process_count(),
            }),
        }
    }

    /// `Need` for every process, derived fresh.
    pub fn need_matrix(&self) -> Matrix<u32> {
        let (rows, cols) = self.max_claim.dims();
        let mut need = Matrix::filled(rows, cols, 0);
        for (i, (max, held)) in self.max_claim.rows().zip(self.allocation.rows()).enumerate() {
            for (j, (m, a)) in max.iter().zip(held).enumerate() {
                if let Some(cell) = need.get_mut(i, j) {
                    *cell = m - a;
                }
            }
        }
        need
    }

    /// Re-check every ledger invariant against the stored fields.
    ///
    /// A state built through [`create`](Self::create) and mutated only through
    /// the transaction manager always passes.
    pub fn verify_invariants(&self) -> Result<(), ConfigError> {
        let expected = derive_available(&self.totals, &self.max_claim, &self.allocation)?;
        if expected != self.available {
            return Err(ConfigError::InconsistentSnapshot { field: "available" });
        }
        Ok(())
    }

    // -- crate-internal access used by the transaction manager --------------

    /// Read one cell, or `None` if out of range.
    pub(crate) fn cell(&self, process: usize, resource: usize) -> Option<Cell> {
        Some(Cell {
            available: *self.available.get(resource)?,
            allocated: *self.allocation.get(process, resource)?,
            max_claim: *self.max_claim.get(process, resource)?,
        })
    }

    fn cell_unchecked(&self, process: usize, resource: usize) -> Cell {
        self.cell(process, resource).unwrap_or(Cell {
            available: 0,
            allocated: 0,
            max_claim: 0,
        })
    }

    /// Overwrite `Avail[resource]` and `Alloc[process][resource]` together.
    ///
    /// Callers have already range-checked the indices and computed values that
    /// keep the ledger balanced.
    pub(crate) fn write_cell(
        &mut self,
        process: usize,
        resource: usize,
        available: u32,
        allocated: u32,
    ) {
        debug_assert!(self.check_index(process, resource).is_ok());
        if let (Some(avail), Some(held)) = (
            self.available.get_mut(resource),
            self.allocation.get_mut(process, resource),
        ) {
            *avail = available;
            *held = allocated;
        }
    }
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

fn expect_len(what: &str, expected: usize, actual: usize) -> Result<(), ConfigError> {
    if expected != actual {
        return Err(ConfigError::DimensionMismatch {
            what: what.to_owned(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn build_matrix(
    what: &str,
    rows: usize,
    cols: usize,
    values: Vec<Vec<u32>>,
) -> Result<Matrix<u32>, ConfigError> {
    expect_len(what, rows, values.len())?;
    Matrix::from_rows(values, cols).map_err(|ragged| ConfigError::DimensionMismatch {
        what: format!("{what} row {}", ragged.row),
        expected: cols,
        actual: ragged.len,
    })
}

/// Validate allocations against claims and totals, returning `Avail`.
fn derive_available(
    totals: &[u32],
    max_claim: &Matrix<u32>,
    allocation: &Matrix<u32>,
) -> Result<Vec<u32>, ConfigError> {
    for (process, (max, held)) in max_claim.rows().zip(allocation.rows()).enumerate() {
        for (resource, (&m, &a)) in max.iter().zip(held).enumerate() {
            if a > m {
                return Err(ConfigError::InvalidAllocation(
                    AllocationViolation::ExceedsMaxClaim {
                        process,
                        resource,
                        allocated: a,
                        max: m,
                    },
                ));
            }
        }
    }

    totals
        .iter()
        .enumerate()
        .map(|(resource, &total)| {
            let allocated: u64 = allocation.column(resource).map(|&a| u64::from(a)).sum();
            if allocated > u64::from(total) {
                return Err(ConfigError::InvalidAllocation(
                    AllocationViolation::ExceedsTotal {
                        resource,
                        allocated,
                        total,
                    },
                ));
            }
            // allocated <= total, so the difference fits in u32.
            Ok(total - allocated as u32)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn textbook() -> ResourceState {
        ResourceState::create(
            5,
            3,
            vec![10, 5, 7],
            vec![
                vec![7, 5, 3],
                vec![3, 2, 2],
                vec![9, 0, 2],
                vec![2, 2, 2],
                vec![4, 3, 3],
            ],
            vec![
                vec![0, 1, 0],
                vec![2, 0, 0],
                vec![3, 0, 2],
                vec![2, 1, 1],
                vec![0, 0, 2],
            ],
        )
        .unwrap()
    }

    #[test]
    fn available_is_derived_on_construction() {
        let state = textbook();
        assert_eq!(state.available(), &[3, 3, 2]);
        assert_eq!(state.process_count(), 5);
        assert_eq!(state.resource_count(), 3);
        state.verify_invariants().unwrap();
    }

    #[test]
    fn need_is_max_minus_allocation() {
        let state = textbook();
        assert_eq!(state.need(0, 0), Ok(7));
        assert_eq!(state.need(4, 1), Ok(3));
        assert_eq!(state.need_row(1), Ok(vec![1, 2, 2]));
        assert_eq!(
            state.need_matrix().to_rows(),
            vec![
                vec![7, 4, 3],
                vec![1, 2, 2],
                vec![6, 0, 0],
                vec![0, 1, 1],
                vec![4, 3, 1],
            ]
        );
    }

    #[test]
    fn out_of_range_need_is_index_error() {
        let state = textbook();
        assert_eq!(
            state.need(5, 0),
            Err(IndexError {
                axis: Axis::Process,
                index: 5,
                len: 5
            })
        );
        assert_eq!(
            state.need(0, 3),
            Err(IndexError {
                axis: Axis::Resource,
                index: 3,
                len: 3
            })
        );
        assert!(state.need_row(7).is_err());
    }

    #[test]
    fn totals_length_mismatch() {
        let err = ResourceState::create(1, 2, vec![1], vec![vec![1, 1]], vec![vec![0, 0]])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DimensionMismatch {
                what: "totals".to_owned(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn ragged_claim_row_mismatch() {
        let err = ResourceState::create(
            2,
            2,
            vec![2, 2],
            vec![vec![1, 1], vec![1]],
            vec![vec![0, 0], vec![0, 0]],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DimensionMismatch {
                what: "max_claims row 1".to_owned(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn wrong_process_count_mismatch() {
        let err = ResourceState::create(3, 1, vec![2], vec![vec![1]; 3], vec![vec![0]; 2])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DimensionMismatch { expected: 3, actual: 2, .. }
        ));
    }

    #[test]
    fn allocation_above_claim_rejected() {
        let err =
            ResourceState::create(1, 1, vec![5], vec![vec![2]], vec![vec![3]]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidAllocation(AllocationViolation::ExceedsMaxClaim {
                process: 0,
                resource: 0,
                allocated: 3,
                max: 2,
            })
        );
    }

    #[test]
    fn allocation_above_total_rejected() {
        let err = ResourceState::create(
            2,
            1,
            vec![3],
            vec![vec![2], vec![2]],
            vec![vec![2], vec![2]],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidAllocation(AllocationViolation::ExceedsTotal {
                resource: 0,
                allocated: 4,
                total: 3,
            })
        );
    }

    #[test]
    fn configuration_round_trips_through_state() {
        let state = textbook();
        let rebuilt = ResourceState::from_configuration(state.to_configuration()).unwrap();
        assert_eq!(rebuilt, state);
    }

    #[test]
    fn empty_dimensions_are_valid() {
        let state = ResourceState::create(0, 2, vec![4, 1], vec![], vec![]).unwrap();
        assert_eq!(state.available(), &[4, 1]);
        assert_eq!(state.process_count(), 0);
    }

    #[test]
    fn write_cell_touches_one_allocation() {
        let mut state = textbook();
        state.write_cell(1, 1, 1, 2);
        assert_eq!(state.available(), &[3, 1, 2]);
        assert_eq!(state.allocation(1, 1), Ok(2));
        assert_eq!(state.allocation(2, 1), Ok(0));
        state.verify_invariants().unwrap();
    }
}
