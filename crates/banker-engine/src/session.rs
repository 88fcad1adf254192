//! A single resource-allocation session.
//!
//! [`Session`] is the surface a front end (menu loop, service handler, test
//! harness) talks to. It exclusively owns at most one [`ResourceState`] at a
//! time, an [`AdjustJournal`] of every attempted change, and the
//! [`SessionConfig`] it was created with.
//!
//! Until a configuration is loaded every operation returns
//! [`SessionError::NotLoaded`]. Loading a new configuration replaces the
//! previous state wholesale and clears the journal; a configuration that
//! fails validation leaves the previous state in place.
//!
//! All inputs are already-parsed indices and unit counts. The session does no
//! console I/O and produces no text beyond `tracing` events.
//!
//! # Example
//!
//! ```
//! use banker_engine::prelude::*;
//!
//! let mut session = Session::new(SessionConfig::default()).unwrap();
//! session
//!     .load_configuration(
//!         2,
//!         1,
//!         vec![3],
//!         vec![vec![2], vec![2]],
//!         vec![vec![1], vec![0]],
//!     )
//!     .unwrap();
//!
//! session.request_units(0, 0, 1).unwrap();
//! assert_eq!(session.snapshot().unwrap().available, vec![1]);
//!
//! let report = session.compute_safe_sequence().unwrap();
//! assert_eq!(report.sequence, vec![0, 1]);
//! assert_eq!(session.journal().len(), 1);
//! ```

use banker_core::prelude::*;
use banker_journal::journal::AdjustJournal;
use banker_journal::JournalError;
use tracing::{debug, info};

use crate::config::SessionConfig;

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors produced by [`Session`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No configuration has been loaded yet.
    #[error("no resource configuration loaded")]
    NotLoaded,

    /// The supplied configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A request or release was rejected.
    #[error(transparent)]
    Adjust(#[from] AdjustError),

    /// A lookup used an out-of-range index.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The journal could not be built from the session configuration.
    #[error(transparent)]
    Journal(#[from] JournalError),
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Owns one resource state plus its journal.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    state: Option<ResourceState>,
    manager: TransactionManager,
    journal: AdjustJournal,
    operations_applied: u64,
    last_trace: Option<SafetyTrace>,
}

impl Session {
    /// Create a session with no configuration loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Journal`] if `config.journal_capacity` is
    /// `Some(0)`.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let journal = match config.journal_capacity {
            Some(cap) => AdjustJournal::bounded(cap)?,
            None => AdjustJournal::new(),
        };
        Ok(Self {
            config,
            state: None,
            manager: TransactionManager::new(),
            journal,
            operations_applied: 0,
            last_trace: None,
        })
    }

    // -- loading ------------------------------------------------------------

    /// Load a claim graph from positional inputs, replacing any current state.
    pub fn load_configuration(
        &mut self,
        processes: usize,
        resources: usize,
        totals: Vec<u32>,
        max_claims: Vec<Vec<u32>>,
        allocations: Vec<Vec<u32>>,
    ) -> Result<(), SessionError> {
        let state =
            ResourceState::create(processes, resources, totals, max_claims, allocations)?;
        self.install(state, 0);
        Ok(())
    }

    /// Load a claim graph from a [`Configuration`], replacing any current state.
    pub fn load(&mut self, configuration: Configuration) -> Result<(), SessionError> {
        let state = ResourceState::from_configuration(configuration)?;
        self.install(state, 0);
        Ok(())
    }

    /// Swap in a validated state and reset per-state bookkeeping.
    pub(crate) fn install(&mut self, state: ResourceState, operations_applied: u64) {
        info!(
            processes = state.process_count(),
            resources = state.resource_count(),
            "resource configuration loaded"
        );
        self.state = Some(state);
        self.journal.clear();
        self.operations_applied = operations_applied;
        self.last_trace = None;
    }

    /// Whether a configuration is loaded.
    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    /// The current state, if loaded.
    pub fn state(&self) -> Option<&ResourceState> {
        self.state.as_ref()
    }

    fn loaded(&self) -> Result<&ResourceState, SessionError> {
        self.state.as_ref().ok_or(SessionError::NotLoaded)
    }

    // -- transactions -------------------------------------------------------

    /// Request `count` units of `resource` for `process`.
    pub fn request_units(
        &mut self,
        process: usize,
        resource: usize,
        count: u32,
    ) -> Result<AdjustOutcome, SessionError> {
        self.adjust(process, resource, i64::from(count))
    }

    /// Release `count` units of `resource` held by `process`.
    pub fn release_units(
        &mut self,
        process: usize,
        resource: usize,
        count: u32,
    ) -> Result<AdjustOutcome, SessionError> {
        self.adjust(process, resource, -i64::from(count))
    }

    /// Apply a signed delta and journal the attempt, whatever its outcome.
    pub fn adjust(
        &mut self,
        process: usize,
        resource: usize,
        delta: i64,
    ) -> Result<AdjustOutcome, SessionError> {
        let state = self.state.as_mut().ok_or(SessionError::NotLoaded)?;

        let available_before = state.available().get(resource).copied();
        let result = self.manager.adjust(state, process, resource, delta);
        let available_after = state.available().get(resource).copied();

        self.journal.record_attempt(
            process,
            resource,
            delta,
            &result,
            available_before,
            available_after,
        );
        self.operations_applied += 1;

        result.map_err(SessionError::from)
    }

    // -- inspection ---------------------------------------------------------

    /// Run the safety scan on the current state.
    ///
    /// With `trace_safety` enabled the traced scan runs instead, each
    /// comparison is emitted as a `debug` event, and the trace is kept for
    /// [`last_trace`](Self::last_trace).
    pub fn compute_safe_sequence(&mut self) -> Result<SafetyReport, SessionError> {
        let state = self.state.as_ref().ok_or(SessionError::NotLoaded)?;
        let engine = self.manager.engine();

        if !self.config.trace_safety {
            return Ok(engine.check(state));
        }

        let (report, trace) = engine.check_traced(state);
        for step in trace.steps() {
            debug!(
                pass = step.pass,
                process = step.process,
                need = ?step.need,
                work = ?step.work,
                eligible = step.eligible,
                "safety comparison"
            );
        }
        self.last_trace = Some(trace);
        Ok(report)
    }

    /// Run the traced safety scan regardless of configuration.
    pub fn trace_safe_sequence(&self) -> Result<(SafetyReport, SafetyTrace), SessionError> {
        let state = self.loaded()?;
        Ok(self.manager.engine().check_traced(state))
    }

    /// The trace kept by the last traced [`compute_safe_sequence`](Self::compute_safe_sequence).
    pub fn last_trace(&self) -> Option<&SafetyTrace> {
        self.last_trace.as_ref()
    }

    /// Read-only view of every vector and matrix, derived fields included.
    pub fn snapshot(&self) -> Result<StateSnapshot, SessionError> {
        Ok(self.loaded()?.snapshot())
    }

    /// `Need[process][resource]` of the current state.
    pub fn need(&self, process: usize, resource: usize) -> Result<u32, SessionError> {
        Ok(self.loaded()?.need(process, resource)?)
    }

    /// The adjustment journal since the last load.
    pub fn journal(&self) -> &AdjustJournal {
        &self.journal
    }

    /// The configuration this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Adjust attempts (including rejected ones) since the last load.
    pub fn operations_applied(&self) -> u64 {
        self.operations_applied
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
