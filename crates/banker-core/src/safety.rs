//! Safety algorithm.
//!
//! [`SafetyEngine::check`] decides whether a [`ResourceState`] is *safe*:
//! whether some completion order lets every process obtain its full claim.
//!
//! The scan keeps a working vector `Work`, initialised to `Avail`. Each pass
//! walks the unfinished processes in increasing index order. A process whose
//! whole `Need` row fits in `Work` is marked finished, appended to the
//! sequence, and its allocation is returned to `Work` immediately, so it can
//! unblock higher-indexed processes later in the same pass. A pass that
//! finishes nobody is the fixed point and ends the scan.
//!
//! Lowest-index-first selection makes the sequence a pure function of the
//! state: identical states produce identical sequences.
//!
//! ```
//! use banker_core::prelude::*;
//!
//! let state = ResourceState::create(
//!     2,
//!     1,
//!     vec![3],
//!     vec![vec![3], vec![1]],
//!     vec![vec![1], vec![1]],
//! )
//! .unwrap();
//!
//! let report = SafetyEngine::new().check(&state);
//! assert!(report.safe);
//! assert_eq!(report.sequence, vec![1, 0]);
//! ```

use serde::{Deserialize, Serialize};

use crate::state::ResourceState;

// ---------------------------------------------------------------------------
// SafetyReport
// ---------------------------------------------------------------------------

/// Result of one safety scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyReport {
    /// `true` iff every process could be finished.
    pub safe: bool,
    /// Processes in the order the scan finished them.
    ///
    /// A complete completion order when `safe`; otherwise only the prefix the
    /// scan reached before stalling, which is not a claim of safety.
    pub sequence: Vec<usize>,
}

impl SafetyReport {
    /// The completion order, only when the state is safe.
    pub fn safe_sequence(&self) -> Option<&[usize]> {
        self.safe.then_some(self.sequence.as_slice())
    }
}

// ---------------------------------------------------------------------------
// SafetyTrace
// ---------------------------------------------------------------------------

/// One eligibility comparison made during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyStep {
    /// Zero-based pass number.
    pub pass: usize,
    /// The process examined.
    pub process: usize,
    /// Its `Need` row.
    pub need: Vec<u32>,
    /// `Work` at the moment of comparison (before any release by `process`).
    pub work: Vec<u32>,
    /// Whether `need <= work` held for every resource.
    pub eligible: bool,
}

/// Every comparison a traced scan made, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyTrace {
    steps: Vec<SafetyStep>,
}

impl SafetyTrace {
    /// All steps in scan order.
    pub fn steps(&self) -> &[SafetyStep] {
        &self.steps
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no comparisons were made (e.g. zero processes).
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of passes the scan ran.
    pub fn pass_count(&self) -> usize {
        self.steps.last().map_or(0, |s| s.pass + 1)
    }

    /// Steps that examined `process`.
    pub fn steps_for_process(&self, process: usize) -> impl Iterator<Item = &SafetyStep> {
        self.steps.iter().filter(move |s| s.process == process)
    }
}

// ---------------------------------------------------------------------------
// SafetyEngine
// ---------------------------------------------------------------------------

/// Runs the safety algorithm. Read-only with respect to the state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyEngine;

impl SafetyEngine {
    /// Create a safety engine.
    pub fn new() -> Self {
        Self
    }

    /// Scan `state` and report whether it is safe.
    pub fn check(&self, state: &ResourceState) -> SafetyReport {
        scan(state, None)
    }

    /// Same scan as [`check`](Self::check), also returning every comparison.
    pub fn check_traced(&self, state: &ResourceState) -> (SafetyReport, SafetyTrace) {
        let mut steps = Vec::new();
        let report = scan(state, Some(&mut steps));
        (report, SafetyTrace { steps })
    }

    /// Shorthand for `check(state).safe`.
    pub fn is_safe(&self, state: &ResourceState) -> bool {
        self.check(state).safe
    }
}

fn scan(state: &ResourceState, mut trace: Option<&mut Vec<SafetyStep>>) -> SafetyReport {
    let n = state.process_count();
    let max_claims = state.max_claims();
    let allocations = state.allocations();

    let mut work: Vec<u32> = state.available().to_vec();
    let mut finished = vec![false; n];
    let mut sequence = Vec::with_capacity(n);

    // Each productive pass finishes at least one process, so n passes suffice.
    for pass in 0..n {
        let mut progressed = false;

        for process in 0..n {
            if finished[process] {
                continue;
            }
            let (Some(max), Some(held)) = (max_claims.row(process), allocations.row(process))
            else {
                continue;
            };

            let eligible = max
                .iter()
                .zip(held)
                .zip(&work)
                .all(|((&m, &a), &w)| m - a <= w);

            if let Some(steps) = trace.as_deref_mut() {
                steps.push(SafetyStep {
                    pass,
                    process,
                    need: max.iter().zip(held).map(|(m, a)| m - a).collect(),
                    work: work.clone(),
                    eligible,
                });
            }

            if eligible {
                for (w, &a) in work.iter_mut().zip(held) {
                    *w += a;
                }
                finished[process] = true;
                sequence.push(process);
                progressed = true;
            }
        }

        if !progressed || sequence.len() == n {
            break;
        }
    }

    let safe = sequence.len() == n;
    tracing::trace!(safe, sequence = ?sequence, "safety scan finished");

    SafetyReport { safe, sequence }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
