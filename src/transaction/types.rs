// Core transaction types.
//
// A `Transaction` tracks just enough state to drive the protocol in
// spec.md §3: its kind (read/write vs. read-only), the tick it began
// at (used both for snapshot lookups and as the deadlock-victim age),
// whether a site failure has doomed it, and an audit-only operation
// history.

use crate::common::{Tick, TransactionId};

/// Whether a transaction takes locks and stages writes, or only reads
/// from a fixed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    ReadWrite,
    ReadOnly,
}

/// Why a transaction was aborted; each variant prints a distinct line
/// per spec.md §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    SiteFailure,
    Deadlock,
    ReadOnlyNoVersion,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AbortReason::SiteFailure => "site failure",
            AbortReason::Deadlock => "deadlock",
            AbortReason::ReadOnlyNoVersion => "read-only, no version available",
        };
        write!(f, "{s}")
    }
}

/// A single entry in a transaction's audit-only operation history.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub tick: Tick,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub start_tick: Tick,
    pub kind: TransactionKind,
    /// Set when a site this transaction has touched fails; checked at
    /// `end` to force a site-failure abort instead of a commit.
    pub to_be_aborted: bool,
    /// Append-only; never consulted for correctness, only for display.
    pub operations: Vec<OperationRecord>,
}

impl Transaction {
    pub fn new(id: TransactionId, start_tick: Tick, kind: TransactionKind) -> Self {
        Self {
            id,
            start_tick,
            kind,
            to_be_aborted: false,
            operations: Vec::new(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.kind == TransactionKind::ReadOnly
    }

    pub fn record(&mut self, tick: Tick, description: impl Into<String>) {
        self.operations.push(OperationRecord {
            tick,
            description: description.into(),
        });
    }

    pub fn history(&self) -> &[OperationRecord] {
        &self.operations
    }
}
