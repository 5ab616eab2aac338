//! Per-engine statement counters.

use parking_lot::Mutex;

/// Kind of statement counted by [`QueryStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// A select.
    Select,
    /// An insert.
    Insert,
    /// An update.
    Update,
    /// A delete.
    Delete,
}

/// Counts of statements an engine has executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Selects executed.
    pub selects: u64,
    /// Inserts executed.
    pub inserts: u64,
    /// Updates executed.
    pub updates: u64,
    /// Deletes executed.
    pub deletes: u64,
}

impl StatsSnapshot {
    /// Total number of statements.
    pub fn total(&self) -> u64 {
        self.selects + self.inserts + self.updates + self.deletes
    }
}

/// Shared statement counters.
#[derive(Debug, Default)]
pub struct QueryStats {
    counts: Mutex<StatsSnapshot>,
}

impl QueryStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one statement.
    pub fn record(&self, kind: StatementKind) {
        let mut counts = self.counts.lock();
        match kind {
            StatementKind::Select => counts.selects += 1,
            StatementKind::Insert => counts.inserts += 1,
            StatementKind::Update => counts.updates += 1,
            StatementKind::Delete => counts.deletes += 1,
        }
    }

    /// Current counts.
    pub fn snapshot(&self) -> StatsSnapshot {
        *self.counts.lock()
    }

    /// Reset every counter to zero and return the counts before the reset.
    pub fn reset(&self) -> StatsSnapshot {
        std::mem::take(&mut *self.counts.lock())
    }
}
