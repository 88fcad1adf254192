//! Headless claim-graph walkthrough -- loads the textbook five-process state,
//! runs a few requests and releases, and prints each outcome.
//!
//! Run with:
//!   cargo run --example claim_graph -p banker-engine [SESSION_CONFIG_JSON]
//!
//! With `RUST_LOG` unset the session config's `log_filter` decides which
//! `tracing` events are shown, e.g. `{ "log_filter": "banker_core=debug" }`.

use banker_engine::prelude::*;

// ---------------------------------------------------------------------------
// Scene setup
// ---------------------------------------------------------------------------

fn textbook() -> Configuration {
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

fn main() -> Result<(), anyhow::Error> {
    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_path(path)?,
        None => SessionConfig::default(),
    };
    init_tracing(&config.log_filter);

    let mut session = Session::new(config)?;
    session.load(textbook())?;

    let report = session.compute_safe_sequence()?;
    println!("initial state safe={} sequence={:?}", report.safe, report.sequence);

    let operations = [
        Operation::request(1, 0, 1),
        Operation::request(4, 1, 3),
        Operation::request(0, 0, 8),
        Operation::release(2, 2, 5),
        Operation::release(1, 0, 3),
    ];
    for operation in operations {
        match operation.apply(&mut session) {
            Ok(outcome) => println!("{operation:?} -> {outcome:?}"),
            Err(err) => println!("{operation:?} -> rejected: {err}"),
        }
    }

    let snapshot = session.snapshot()?;
    println!("available={:?}", snapshot.available);
    println!(
        "journal: {} entries, {} rejected",
        session.journal().len(),
        session.journal().rejections().count()
    );
    Ok(())
}
