//! Adjustment journal recording every request and release attempt.
//!
//! The [`AdjustJournal`] keeps one [`JournalEntry`] per call to
//! `TransactionManager::adjust`, whether the call succeeded or was rejected.
//! Each entry captures the target cell, the signed delta, the outcome
//! classification, and the availability of the touched resource before and
//! after the call (equal for rejections, since rejected calls never mutate).
//!
//! # Query API
//!
//! - **Process**: [`AdjustJournal::entries_for_process`]
//! - **Resource**: [`AdjustJournal::entries_for_resource`]
//! - **Outcome**: [`AdjustJournal::rejections`], [`AdjustJournal::count_outcome`]
//!
//! # Example
//!
//! ```
//! use banker_core::prelude::*;
//! use banker_journal::journal::{AdjustJournal, EntryOutcome};
//!
//! let mut state = ResourceState::create(1, 1, vec![2], vec![vec![2]], vec![vec![0]]).unwrap();
//! let manager = TransactionManager::new();
//! let mut journal = AdjustJournal::new();
//!
//! let before = state.available()[0];
//! let result = manager.request_units(&mut state, 0, 0, 1);
//! journal.record_attempt(0, 0, 1, &result, Some(before), Some(state.available()[0]));
//!
//! assert_eq!(journal.len(), 1);
//! assert_eq!(journal.count_outcome(EntryOutcome::Granted), 1);
//! assert_eq!(journal.net_units(0, 0), 1);
//! ```

use std::collections::VecDeque;

use banker_core::transaction::AdjustOutcome;
use banker_core::{AdjustError, AdjustErrorKind};
use serde::{Deserialize, Serialize};

use crate::JournalError;

// ---------------------------------------------------------------------------
// EntryOutcome
// ---------------------------------------------------------------------------

/// Outcome classification of one journaled attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryOutcome {
    /// A request was granted.
    Granted,
    /// A release was applied.
    Released,
    /// A zero delta; nothing changed.
    Unchanged,
    /// The attempt was rejected; the state did not change.
    Rejected(AdjustErrorKind),
}

impl EntryOutcome {
    /// Classify the result of an adjust call.
    pub fn from_result(result: &Result<AdjustOutcome, AdjustError>) -> Self {
        match result {
            Ok(outcome) => Self::from_outcome(outcome),
            Err(err) => EntryOutcome::Rejected(err.kind()),
        }
    }

    /// Classify a successful adjust call.
    pub fn from_outcome(outcome: &AdjustOutcome) -> Self {
        match outcome {
            AdjustOutcome::Granted { .. } => EntryOutcome::Granted,
            AdjustOutcome::Released { .. } => EntryOutcome::Released,
            AdjustOutcome::Unchanged => EntryOutcome::Unchanged,
        }
    }

    /// Whether this outcome is a rejection of any kind.
    pub fn is_rejection(self) -> bool {
        matches!(self, EntryOutcome::Rejected(_))
    }
}

// ---------------------------------------------------------------------------
// JournalEntry
// ---------------------------------------------------------------------------

/// One recorded adjust attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Monotonic position of this entry since the journal was last cleared.
    pub sequence: u64,
    /// Target process index as supplied by the caller.
    pub process: usize,
    /// Target resource index as supplied by the caller.
    pub resource: usize,
    /// Signed unit delta (positive = request, negative = release).
    pub delta: i64,
    /// What happened.
    pub outcome: EntryOutcome,
    /// `Avail[resource]` before the call, `None` if `resource` was out of range.
    pub available_before: Option<u32>,
    /// `Avail[resource]` after the call, `None` if `resource` was out of range.
    pub available_after: Option<u32>,
}

impl JournalEntry {
    /// Units that actually moved: `delta` for applied grants and releases,
    /// zero otherwise.
    pub fn applied_delta(&self) -> i64 {
        match self.outcome {
            EntryOutcome::Granted | EntryOutcome::Released => self.delta,
            EntryOutcome::Unchanged | EntryOutcome::Rejected(_) => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// AdjustJournal
// ---------------------------------------------------------------------------

/// Ordered record of adjust attempts, optionally bounded.
///
/// A bounded journal evicts its oldest entries first. Sequence numbers keep
/// increasing across evictions and restart at zero only after
/// [`clear`](Self::clear).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "JournalParts")]
pub struct AdjustJournal {
    entries: VecDeque<JournalEntry>,
    capacity: Option<usize>,
    next_sequence: u64,
    evicted: u64,
}

/// Unvalidated serialized form of an [`AdjustJournal`].
#[derive(Deserialize)]
struct JournalParts {
    entries: VecDeque<JournalEntry>,
    capacity: Option<usize>,
    next_sequence: u64,
    evicted: u64,
}

impl TryFrom<JournalParts> for AdjustJournal {
    type Error = JournalError;

    fn try_from(parts: JournalParts) -> Result<Self, JournalError> {
        if parts.capacity == Some(0) {
            return Err(JournalError::ZeroCapacity);
        }
        Ok(Self {
            entries: parts.entries,
            capacity: parts.capacity,
            next_sequence: parts.next_sequence,
            evicted: parts.evicted,
        })
    }
}

impl AdjustJournal {
    /// Create an unbounded journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a journal that keeps at most `capacity` entries.
    pub fn bounded(capacity: usize) -> Result<Self, JournalError> {
        if capacity == 0 {
            return Err(JournalError::ZeroCapacity);
        }
        Ok(Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
            ..Self::default()
        })
    }

    /// Record one adjust attempt and return its sequence number.
    pub fn record_attempt(
        &mut self,
        process: usize,
        resource: usize,
        delta: i64,
        result: &Result<AdjustOutcome, AdjustError>,
        available_before: Option<u32>,
        available_after: Option<u32>,
    ) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        if let Some(cap) = self.capacity {
            while self.entries.len() >= cap {
                let Some(old) = self.entries.pop_front() else {
                    break;
                };
                self.evicted += 1;
                tracing::trace!(sequence = old.sequence, "journal entry evicted");
            }
        }

        self.entries.push_back(JournalEntry {
            sequence,
            process,
            resource,
            delta,
            outcome: EntryOutcome::from_result(result),
            available_before,
            available_after,
        });
        sequence
    }

    /// Remove every entry and reset sequence numbering.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_sequence = 0;
        self.evicted = 0;
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Entries dropped by the capacity bound since the last clear.
    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    /// All held entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&JournalEntry> {
        self.entries.back()
    }

    /// Entries targeting `process`.
    pub fn entries_for_process(&self, process: usize) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(move |e| e.process == process)
    }

    /// Entries targeting `resource`.
    pub fn entries_for_resource(&self, resource: usize) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(move |e| e.resource == resource)
    }

    /// Entries whose attempt was rejected.
    pub fn rejections(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(|e| e.outcome.is_rejection())
    }

    /// Number of held entries with exactly this outcome.
    pub fn count_outcome(&self, outcome: EntryOutcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    /// Net units moved into `Alloc[process][resource]` by the held entries.
    pub fn net_units(&self, process: usize, resource: usize) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.process == process && e.resource == resource)
            .map(JournalEntry::applied_delta)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
