//! Integration tests for operation recording and replay.
//!
//! These validate recording, replaying, divergence detection after the
//! starting state is edited, and JSON serialization of [`OperationLog`].

use banker_engine::prelude::*;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn classic_session() -> Session {
    let mut session = Session::new(SessionConfig::default()).unwrap();
    session
        .load_configuration(
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
        .unwrap();
    session
}

fn record_all(session: &mut Session, operations: &[Operation], interval: u64) -> OperationLog {
    let mut recorder = ReplayRecorder::new(session.capture_snapshot().unwrap(), interval);
    for &operation in operations {
        // Rejections are part of the record too.
        let _ = record_operation(session, &mut recorder, operation);
    }
    recorder.finish()
}

fn scripted_operations() -> Vec<Operation> {
    vec![
        Operation::request(1, 0, 1),
        Operation::request(4, 1, 3),
        Operation::request(1, 2, 2),
        Operation::release(1, 0, 3),
        Operation::request(0, 0, 9),
        Operation::release(3, 1, 1),
        Operation::request(4, 1, 2),
    ]
}

// ---------------------------------------------------------------------------
// Recording and replaying
// ---------------------------------------------------------------------------

#[test]
fn replay_reproduces_final_state() {
    let mut session = classic_session();
    let log = record_all(&mut session, &scripted_operations(), 2);
    let expected_hash = session.state_hash().unwrap();

    let mut fresh = Session::new(SessionConfig::default()).unwrap();
    let result = replay(&mut fresh, &log).unwrap();

    assert!(result.completed);
    assert_eq!(result.operations_replayed, 7);
    assert_eq!(fresh.state_hash().unwrap(), expected_hash);
    assert_eq!(fresh.journal().len(), 7);
    assert_eq!(fresh.journal().rejections().count(), 2);
}

#[test]
fn replay_log_survives_json() {
    let mut session = classic_session();
    let log = record_all(&mut session, &scripted_operations(), 1);

    let json = serde_json::to_string_pretty(&log).unwrap();
    let restored: OperationLog = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, log);

    let result = replay(&mut classic_session(), &restored).unwrap();
    assert!(result.completed);
}

#[test]
fn changed_starting_state_diverges() {
    let mut session = classic_session();
    let mut log = record_all(&mut session, &scripted_operations(), 1);

    // Record the same operations against a start where process 4 holds one
    // fewer unit of resource 2. Outcomes match but the hashes do not.
    let mut edited = log.initial_snapshot.state.clone();
    edited.allocations[4][2] = 1;
    let mut edited_session = Session::new(SessionConfig::default()).unwrap();
    edited_session
        .load_configuration(5, 3, edited.totals, edited.max_claims, edited.allocations)
        .unwrap();
    log.initial_snapshot = edited_session.capture_snapshot().unwrap();

    let result = replay(&mut classic_session(), &log).unwrap();
    assert!(!result.completed);
    let divergence = result.first_divergence.unwrap();
    assert_eq!(divergence.index, 0);
    assert!(matches!(divergence.kind, DivergenceKind::StateHash { .. }));
}

#[test]
fn tampered_initial_snapshot_is_rejected() {
    let mut session = classic_session();
    let mut log = record_all(&mut session, &scripted_operations(), 1);
    log.initial_snapshot.state.totals[0] = 11;

    let err = replay(&mut classic_session(), &log).unwrap_err();
    assert!(format!("{err}").contains("hash mismatch"), "got: {err}");
}

#[test]
fn empty_log_replays_trivially() {
    let session = classic_session();
    let log = ReplayRecorder::new(session.capture_snapshot().unwrap(), 1).finish();
    let mut fresh = Session::new(SessionConfig::default()).unwrap();
    let result = replay(&mut fresh, &log).unwrap();
    assert!(result.completed);
    assert_eq!(result.operations_replayed, 0);
    assert!(fresh.is_loaded());
}

// ---------------------------------------------------------------------------
// Property: any recorded run replays without divergence
// ---------------------------------------------------------------------------

fn operation_strategy() -> impl Strategy<Value = Operation> {
    (any::<bool>(), 0..6usize, 0..4usize, 0..5u32).prop_map(|(request, p, r, units)| {
        if request {
            Operation::request(p, r, units)
        } else {
            Operation::release(p, r, units)
        }
    })
}

proptest! {
    #[test]
    fn recorded_runs_replay_deterministically(
        operations in prop::collection::vec(operation_strategy(), 0..40),
        interval in 0..4u64,
    ) {
        let mut session = classic_session();
        let log = record_all(&mut session, &operations, interval);
        prop_assert_eq!(log.total_operations, operations.len() as u64);

        let mut fresh = Session::new(SessionConfig::default()).unwrap();
        let result = replay(&mut fresh, &log).unwrap();
        prop_assert!(result.completed);
        prop_assert!(result.first_divergence.is_none());
        prop_assert_eq!(fresh.state_hash().unwrap(), session.state_hash().unwrap());
    }
}
