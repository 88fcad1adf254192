//! Integration tests for the classic five-process, three-resource example.
//!
//! Each test starts from the same textbook state (`R = [10, 5, 7]`,
//! `Avail = [3, 3, 2]`) and drives it through the public API only.

use banker_core::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn textbook_config() -> Configuration {
    Configuration {
        processes: 5,
        resources: 3,
        totals: vec![10, 5, 7],
        max_claims: vec![
            vec![7, 5, 3],
            vec![3, 2, 2],
            vec![9, 0, 2],
            vec![2, 2, 2],
            vec![4, 3, 3],
        ],
        allocations: vec![
            vec![0, 1, 0],
            vec![2, 0, 0],
            vec![3, 0, 2],
            vec![2, 1, 1],
            vec![0, 0, 2],
        ],
    }
}

fn textbook() -> ResourceState {
    ResourceState::from_configuration(textbook_config()).expect("textbook config is valid")
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn initial_state_is_safe_in_expected_order() {
    let state = textbook();
    assert_eq!(state.available(), &[3, 3, 2]);

    let report = SafetyEngine::new().check(&state);
    assert!(report.safe);
    assert_eq!(report.sequence, vec![1, 3, 4, 0, 2]);
}

#[test]
fn small_request_within_need_is_granted() {
    let mut state = textbook();
    let outcome = TransactionManager::new()
        .request_units(&mut state, 1, 0, 1)
        .unwrap();

    assert_eq!(
        outcome,
        AdjustOutcome::Granted {
            process: 1,
            resource: 0,
            units: 1,
            sequence: vec![1, 3, 4, 0, 2],
        }
    );
    assert_eq!(state.available(), &[2, 3, 2]);
    assert_eq!(state.allocation(1, 0), Ok(3));
    assert_eq!(state.need(1, 0), Ok(0));
}

#[test]
fn two_units_of_r1_for_p4_leave_a_completion_order() {
    // Avail becomes [3, 1, 2] and Need[4] becomes [4, 1, 1]; p3 then p4 can
    // finish in the first pass, which frees enough for p1, p2 and p0.
    let mut state = textbook();
    let outcome = TransactionManager::new()
        .request_units(&mut state, 4, 1, 2)
        .unwrap();

    match outcome {
        AdjustOutcome::Granted { sequence, .. } => assert_eq!(sequence, vec![3, 4, 1, 2, 0]),
        other => panic!("expected Granted, got {other:?}"),
    }
    assert_eq!(state.available(), &[3, 1, 2]);
}

#[test]
fn request_draining_r1_is_denied_and_rolled_back() {
    let mut state = textbook();
    let before = state.clone();
    let before_snapshot = state.snapshot();

    let err = TransactionManager::new()
        .request_units(&mut state, 4, 1, 3)
        .unwrap_err();

    assert_eq!(err.kind(), AdjustErrorKind::Unsafe);
    assert_eq!(state, before);
    assert_eq!(state.snapshot(), before_snapshot);
    assert_eq!(state.available(), &[3, 3, 2]);
}

#[test]
fn request_above_need_is_rejected_before_mutation() {
    let mut state = textbook();
    let before = state.clone();

    let err = TransactionManager::new()
        .request_units(&mut state, 0, 0, 8)
        .unwrap_err();

    assert_eq!(
        err,
        AdjustError::ExceedsClaim {
            process: 0,
            resource: 0,
            requested: 8,
            need: 7,
        }
    );
    assert_eq!(state, before);
}

#[test]
fn release_above_allocation_is_rejected() {
    let mut state = textbook();
    let before = state.clone();

    let err = TransactionManager::new()
        .release_units(&mut state, 2, 2, 5)
        .unwrap_err();

    assert_eq!(
        err,
        AdjustError::ExceedsAllocation {
            process: 2,
            resource: 2,
            released: 5,
            allocated: 2,
        }
    );
    assert_eq!(state, before);
}

#[test]
fn out_of_range_indices_are_rejected() {
    let mut state = textbook();
    let manager = TransactionManager::new();

    let err = manager.request_units(&mut state, 9, 0, 1).unwrap_err();
    assert_eq!(err.kind(), AdjustErrorKind::OutOfRange);

    let err = manager.release_units(&mut state, 0, 3, 1).unwrap_err();
    assert_eq!(err.kind(), AdjustErrorKind::OutOfRange);
}

#[test]
fn granting_then_releasing_restores_the_original_state() {
    let mut state = textbook();
    let original = state.clone();
    let manager = TransactionManager::new();

    manager.request_units(&mut state, 1, 0, 1).unwrap();
    manager.request_units(&mut state, 3, 1, 1).unwrap();
    manager.release_units(&mut state, 3, 1, 1).unwrap();
    manager.release_units(&mut state, 1, 0, 1).unwrap();

    assert_eq!(state, original);
}

#[test]
fn process_can_run_to_completion_and_release_everything() {
    let mut state = textbook();
    let manager = TransactionManager::new();

    // p1 needs [1, 2, 2] and all of it fits in [3, 3, 2].
    manager.request_units(&mut state, 1, 0, 1).unwrap();
    manager.request_units(&mut state, 1, 1, 2).unwrap();
    manager.request_units(&mut state, 1, 2, 2).unwrap();
    assert_eq!(state.need_row(1), Ok(vec![0, 0, 0]));
    assert_eq!(state.available(), &[2, 1, 0]);

    manager.release_units(&mut state, 1, 0, 3).unwrap();
    manager.release_units(&mut state, 1, 1, 2).unwrap();
    manager.release_units(&mut state, 1, 2, 2).unwrap();
    assert_eq!(state.available(), &[5, 3, 2]);
    state.verify_invariants().unwrap();
}

#[test]
fn snapshot_view_matches_state() {
    let snap = textbook().snapshot();
    assert_eq!(snap.totals, vec![10, 5, 7]);
    assert_eq!(snap.available, vec![3, 3, 2]);
    assert_eq!(snap.need[0], vec![7, 4, 3]);
    assert_eq!(snap.allocations[4], vec![0, 0, 2]);
}

#[test]
fn configuration_loads_from_json() {
    let json = serde_json::to_string(&textbook_config()).unwrap();
    let config: Configuration = serde_json::from_str(&json).unwrap();
    let state = ResourceState::from_configuration(config).unwrap();
    assert_eq!(state, textbook());
}
