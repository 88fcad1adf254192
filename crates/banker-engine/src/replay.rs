//! Deterministic replay of request/release sequences.
//!
//! A [`ReplayRecorder`] captures the operations applied to a [`Session`]
//! together with each operation's outcome classification and periodic state
//! hash checkpoints, producing an [`OperationLog`]. [`replay`] restores the
//! log's initial snapshot, re-applies every operation, and reports the first
//! point where either an outcome or a checkpoint hash differs.
//!
//! # Recording
//!
//! ```
//! use banker_engine::prelude::*;
//!
//! let mut session = Session::new(SessionConfig::default()).unwrap();
//! session
//!     .load_configuration(2, 1, vec![4], vec![vec![3], vec![3]], vec![vec![1], vec![1]])
//!     .unwrap();
//!
//! let mut recorder = ReplayRecorder::new(session.capture_snapshot().unwrap(), 1);
//! record_operation(&mut session, &mut recorder, Operation::request(0, 0, 1)).unwrap();
//! record_operation(&mut session, &mut recorder, Operation::request(1, 0, 1)).unwrap_err();
//! let log = recorder.finish();
//!
//! let mut fresh = Session::new(SessionConfig::default()).unwrap();
//! let result = replay(&mut fresh, &log).unwrap();
//! assert!(result.completed);
//! assert_eq!(result.operations_replayed, 2);
//! assert!(result.first_divergence.is_none());
//! ```

use std::collections::BTreeMap;

use banker_core::prelude::*;
use banker_journal::journal::EntryOutcome;
use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionError};
use crate::snapshot::SessionSnapshot;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// One replayable call against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// `request_units(process, resource, units)`.
    Request {
        /// Requesting process index.
        process: usize,
        /// Requested resource index.
        resource: usize,
        /// Units requested.
        units: u32,
    },
    /// `release_units(process, resource, units)`.
    Release {
        /// Releasing process index.
        process: usize,
        /// Released resource index.
        resource: usize,
        /// Units released.
        units: u32,
    },
}

impl Operation {
    /// Shorthand for [`Operation::Request`].
    pub fn request(process: usize, resource: usize, units: u32) -> Self {
        Operation::Request {
            process,
            resource,
            units,
        }
    }

    /// Shorthand for [`Operation::Release`].
    pub fn release(process: usize, resource: usize, units: u32) -> Self {
        Operation::Release {
            process,
            resource,
            units,
        }
    }

    /// Apply this operation to `session`.
    pub fn apply(self, session: &mut Session) -> Result<AdjustOutcome, SessionError> {
        match self {
            Operation::Request {
                process,
                resource,
                units,
            } => session.request_units(process, resource, units),
            Operation::Release {
                process,
                resource,
                units,
            } => session.release_units(process, resource, units),
        }
    }
}

/// Classify a session result the way the journal does.
///
/// `None` for errors that are not adjust rejections (e.g. no state loaded).
fn classify(result: &Result<AdjustOutcome, SessionError>) -> Option<EntryOutcome> {
    match result {
        Ok(outcome) => Some(EntryOutcome::from_outcome(outcome)),
        Err(SessionError::Adjust(err)) => Some(EntryOutcome::Rejected(err.kind())),
        Err(_) => None,
    }
}

// ---------------------------------------------------------------------------
// OperationLog
// ---------------------------------------------------------------------------

/// A recorded run: initial snapshot plus the ordered operations and
/// checkpoints that followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLog {
    /// Replay starts by restoring this snapshot.
    pub initial_snapshot: SessionSnapshot,
    /// Number of operations recorded. Indices run `0..total_operations`.
    pub total_operations: u64,
    /// Operations and checkpoints in recording order.
    pub entries: Vec<ReplayEntry>,
}

/// A single entry in an [`OperationLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// An operation and the outcome it produced when recorded.
    Operation {
        /// Position in the recorded run, starting at zero.
        index: u64,
        /// The call that was made.
        operation: Operation,
        /// How the call was classified when recorded.
        outcome: EntryOutcome,
    },
    /// State hash taken right after operation `index` was applied.
    Checkpoint {
        /// The operation this checkpoint follows.
        index: u64,
        /// BLAKE3 hex digest of the session after that operation.
        state_hash: String,
    },
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// Outcome of replaying an [`OperationLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Whether every operation replayed without divergence.
    pub completed: bool,
    /// Operations applied before stopping.
    pub operations_replayed: u64,
    /// The first mismatch, if any.
    pub first_divergence: Option<ReplayDivergence>,
}

/// Where and how a replay departed from its log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    /// Index of the operation at which the mismatch was detected.
    pub index: u64,
    /// What differed.
    pub kind: DivergenceKind,
}

/// The two ways a replayed operation can disagree with its log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DivergenceKind {
    /// The operation was classified differently than when recorded.
    Outcome {
        /// Outcome stored in the log.
        expected: EntryOutcome,
        /// Outcome produced during replay.
        actual: EntryOutcome,
    },
    /// The state hash after the operation differs from the checkpoint.
    StateHash {
        /// Hash stored in the checkpoint.
        expected: String,
        /// Hash computed during replay.
        actual: String,
    },
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Builds an [`OperationLog`] one operation at a time.
#[derive(Debug)]
pub struct ReplayRecorder {
    log: OperationLog,
    /// Checkpoint after every `checkpoint_interval` operations. Zero means
    /// checkpoint whenever a hash is supplied.
    checkpoint_interval: u64,
    recorded: u64,
}

impl ReplayRecorder {
    /// Start recording from `initial_snapshot`.
    ///
    /// `checkpoint_interval` of 10 checkpoints after operations 9, 19, 29
    /// and so on. Zero checkpoints after every operation recorded with a
    /// hash.
    pub fn new(initial_snapshot: SessionSnapshot, checkpoint_interval: u64) -> Self {
        Self {
            log: OperationLog {
                initial_snapshot,
                total_operations: 0,
                entries: Vec::new(),
            },
            checkpoint_interval,
            recorded: 0,
        }
    }

    /// Record an operation that has just been applied.
    ///
    /// `state_hash` is the session hash after the operation. It becomes a
    /// checkpoint when the operation count falls on the interval.
    pub fn record(&mut self, operation: Operation, outcome: EntryOutcome, state_hash: Option<String>) {
        let index = self.recorded;
        self.recorded += 1;

        self.log.entries.push(ReplayEntry::Operation {
            index,
            operation,
            outcome,
        });

        if let Some(hash) = state_hash {
            let due = self.checkpoint_interval == 0 || self.recorded % self.checkpoint_interval == 0;
            if due {
                self.log.entries.push(ReplayEntry::Checkpoint {
                    index,
                    state_hash: hash,
                });
            }
        }
    }

    /// Operations recorded so far.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Stop recording and return the completed [`OperationLog`].
    pub fn finish(mut self) -> OperationLog {
        self.log.total_operations = self.recorded;
        self.log
    }
}

/// Apply `operation` to `session` and record it, with its post-operation hash.
///
/// Returns the session result unchanged. Errors other than adjust rejections
/// (no configuration loaded) are returned without recording anything.
pub fn record_operation(
    session: &mut Session,
    recorder: &mut ReplayRecorder,
    operation: Operation,
) -> Result<AdjustOutcome, SessionError> {
    let result = operation.apply(session);
    let Some(outcome) = classify(&result) else {
        return result;
    };
    let hash = session.state_hash()?;
    recorder.record(operation, outcome, Some(hash));
    result
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay `log` on `session`, checking outcomes and checkpoints.
///
/// The log is validated before the session is touched: duplicate indices,
/// indices outside `0..total_operations`, or a missing operation are errors.
/// Replay stops at the first divergence.
///
/// # Errors
///
/// Returns an error for a malformed log, for a snapshot that fails to
/// restore, or if an operation fails for a reason other than an adjust
/// rejection.
pub fn replay(session: &mut Session, log: &OperationLog) -> Result<ReplayResult, anyhow::Error> {
    let mut operations: BTreeMap<u64, (Operation, EntryOutcome)> = BTreeMap::new();
    let mut checkpoints: BTreeMap<u64, &str> = BTreeMap::new();

    for entry in &log.entries {
        match entry {
            ReplayEntry::Operation {
                index,
                operation,
                outcome,
            } => {
                if *index >= log.total_operations {
                    return Err(anyhow::anyhow!(
                        "operation index {index} outside recorded range 0..{}",
                        log.total_operations
                    ));
                }
                if operations.insert(*index, (*operation, *outcome)).is_some() {
                    return Err(anyhow::anyhow!(
                        "operation log contains duplicate operation at index {index}"
                    ));
                }
            }
            ReplayEntry::Checkpoint { index, state_hash } => {
                if *index >= log.total_operations {
                    return Err(anyhow::anyhow!(
                        "checkpoint index {index} outside recorded range 0..{}",
                        log.total_operations
                    ));
                }
                if checkpoints.insert(*index, state_hash.as_str()).is_some() {
                    return Err(anyhow::anyhow!(
                        "operation log contains duplicate checkpoint at index {index}"
                    ));
                }
            }
        }
    }

    if operations.len() as u64 != log.total_operations {
        return Err(anyhow::anyhow!(
            "operation log records {} operations but holds {}",
            log.total_operations,
            operations.len()
        ));
    }

    session
        .restore_from_snapshot(&log.initial_snapshot)
        .map_err(|e| anyhow::anyhow!("failed to restore initial snapshot for replay: {e}"))?;

    let mut operations_replayed: u64 = 0;

    for (&index, &(operation, expected)) in &operations {
        let result = operation.apply(session);
        operations_replayed += 1;

        let actual = classify(&result).ok_or_else(|| {
            anyhow::anyhow!("operation {index} failed during replay: {result:?}")
        })?;
        if actual != expected {
            tracing::warn!(index, ?expected, ?actual, "replay outcome diverged");
            return Ok(diverged(
                operations_replayed,
                index,
                DivergenceKind::Outcome { expected, actual },
            ));
        }

        if let Some(&expected_hash) = checkpoints.get(&index) {
            let actual_hash = session.state_hash()?;
            if actual_hash != expected_hash {
                tracing::warn!(index, "replay state hash diverged");
                return Ok(diverged(
                    operations_replayed,
                    index,
                    DivergenceKind::StateHash {
                        expected: expected_hash.to_owned(),
                        actual: actual_hash,
                    },
                ));
            }
        }
    }

    Ok(ReplayResult {
        completed: true,
        operations_replayed,
        first_divergence: None,
    })
}

fn diverged(operations_replayed: u64, index: u64, kind: DivergenceKind) -> ReplayResult {
    ReplayResult {
        completed: false,
        operations_replayed,
        first_divergence: Some(ReplayDivergence { index, kind }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    fn session() -> Session {
        let mut session = Session::new(SessionConfig::default()).unwrap();
        session
            .load_configuration(2, 1, vec![4], vec![vec![3], vec![3]], vec![vec![1], vec![1]])
            .unwrap();
        session
    }

    fn recorded_log(interval: u64) -> OperationLog {
        let mut s = session();
        let mut recorder = ReplayRecorder::new(s.capture_snapshot().unwrap(), interval);
        record_operation(&mut s, &mut recorder, Operation::request(0, 0, 1)).unwrap();
        record_operation(&mut s, &mut recorder, Operation::request(1, 0, 1)).unwrap_err();
        record_operation(&mut s, &mut recorder, Operation::release(0, 0, 2)).unwrap();
        recorder.finish()
    }

    fn checkpoint_count(log: &OperationLog) -> usize {
        log.entries
            .iter()
            .filter(|e| matches!(e, ReplayEntry::Checkpoint { .. }))
            .count()
    }

    #[test]
    fn recorder_respects_checkpoint_interval() {
        assert_eq!(checkpoint_count(&recorded_log(1)), 3);
        assert_eq!(checkpoint_count(&recorded_log(2)), 1);
        assert_eq!(checkpoint_count(&recorded_log(0)), 3);
        assert_eq!(recorded_log(5).total_operations, 3);
    }

    #[test]
    fn recorded_outcomes_are_classified() {
        let log = recorded_log(1);
        let outcomes: Vec<_> = log
            .entries
            .iter()
            .filter_map(|e| match e {
                ReplayEntry::Operation { outcome, .. } => Some(*outcome),
                ReplayEntry::Checkpoint { .. } => None,
            })
            .collect();
        assert_eq!(
            outcomes,
            vec![
                EntryOutcome::Granted,
                EntryOutcome::Rejected(AdjustErrorKind::Unsafe),
                EntryOutcome::Released,
            ]
        );
    }

    #[test]
    fn clean_replay_completes() {
        let log = recorded_log(1);
        let mut fresh = Session::new(SessionConfig::default()).unwrap();
        let result = replay(&mut fresh, &log).unwrap();
        assert!(result.completed);
        assert_eq!(result.operations_replayed, 3);
        assert_eq!(fresh.snapshot().unwrap().available, vec![3]);
        assert_eq!(fresh.journal().len(), 3);
    }

    #[test]
    fn edited_outcome_is_reported() {
        let mut log = recorded_log(1);
        if let ReplayEntry::Operation { outcome, .. } = &mut log.entries[2] {
            *outcome = EntryOutcome::Granted;
        }
        let result = replay(&mut session(), &log).unwrap();
        assert!(!result.completed);
        let divergence = result.first_divergence.unwrap();
        assert_eq!(divergence.index, 1);
        assert_eq!(
            divergence.kind,
            DivergenceKind::Outcome {
                expected: EntryOutcome::Granted,
                actual: EntryOutcome::Rejected(AdjustErrorKind::Unsafe),
            }
        );
    }

    #[test]
    fn edited_checkpoint_is_reported() {
        let mut log = recorded_log(1);
        if let ReplayEntry::Checkpoint { state_hash, .. } = &mut log.entries[1] {
            *state_hash = "0".repeat(64);
        }
        let result = replay(&mut session(), &log).unwrap();
        let divergence = result.first_divergence.unwrap();
        assert_eq!(divergence.index, 0);
        assert!(matches!(divergence.kind, DivergenceKind::StateHash { .. }));
        assert_eq!(result.operations_replayed, 1);
    }

    #[test]
    fn duplicate_checkpoint_is_rejected_before_mutation() {
        let mut log = recorded_log(1);
        log.entries.push(ReplayEntry::Checkpoint {
            index: 0,
            state_hash: String::new(),
        });
        let mut s = session();
        s.request_units(0, 0, 2).unwrap();
        let before = s.snapshot().unwrap();

        let err = replay(&mut s, &log).unwrap_err();
        assert!(err.to_string().contains("duplicate checkpoint"), "got: {err}");
        assert_eq!(s.snapshot().unwrap(), before);
    }

    #[test]
    fn missing_operation_is_rejected() {
        let mut log = recorded_log(0);
        log.entries.retain(|e| !matches!(e, ReplayEntry::Operation { index: 1, .. }));
        assert!(replay(&mut session(), &log).is_err());
    }

    #[test]
    fn unloaded_session_is_not_recorded() {
        let mut s = Session::new(SessionConfig::default()).unwrap();
        let snapshot = session().capture_snapshot().unwrap();
        let mut recorder = ReplayRecorder::new(snapshot, 1);
        let err = record_operation(&mut s, &mut recorder, Operation::request(0, 0, 1)).unwrap_err();
        assert_eq!(err, SessionError::NotLoaded);
        assert_eq!(recorder.recorded(), 0);
    }
}
