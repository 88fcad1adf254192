//! Banker Journal - audit trail of resource adjustments.
//!
//! This crate records every request and release attempted against a
//! resource state, successful or not, together with the outcome
//! classification and the affected resource's availability before and after.
//!
//! # Modules
//!
//! - [`journal`]: The [`AdjustJournal`](journal::AdjustJournal) and its
//!   query API (by process, by resource, by outcome).

#![deny(unsafe_code)]

pub mod journal;

/// Errors produced when configuring a journal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    /// A bounded journal must hold at least one entry.
    #[error("journal capacity must be at least 1")]
    ZeroCapacity,
}
