use std::sync::atomic::{AtomicU64, Ordering};
use token_refresh_core::PersistOutcome;

/// Running totals since process start
#[derive(Debug, Default)]
pub struct RefreshStats {
    pub cycles: AtomicU64,
    pub idle_cycles: AtomicU64,
    pub updated: AtomicU64,
    pub unchanged: AtomicU64,
    pub preserved: AtomicU64,
    pub failed: AtomicU64,
    pub skipped_entries: AtomicU64,
}

impl RefreshStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&self, outcome: PersistOutcome) {
        let counter = match outcome {
            PersistOutcome::Updated => &self.updated,
            PersistOutcome::Unchanged => &self.unchanged,
            PersistOutcome::PreservedStale => &self.preserved,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RefreshStatsSnapshot {
        RefreshStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            idle_cycles: self.idle_cycles.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            preserved: self.preserved.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped_entries: self.skipped_entries.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStatsSnapshot {
    pub cycles: u64,
    pub idle_cycles: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub preserved: u64,
    pub failed: u64,
    pub skipped_entries: u64,
}
