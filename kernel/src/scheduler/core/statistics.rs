//! Statistics - Scheduler activity tracking
//!
//! Counters are updated without the scheduler lock.

use core::sync::atomic::{AtomicU64, Ordering};

pub struct SchedulerStats {
    /// Scheduling passes run
    pub passes: AtomicU64,

    /// Passes folded into a pass already in progress
    pub coalesced: AtomicU64,

    /// Tasks handed to the executor
    pub dispatched: AtomicU64,

    /// Tasks cancelled by the selector for a missed slot
    pub deadline_misses: AtomicU64,

    /// Late tasks given a new window
    pub repairs: AtomicU64,

    /// Repairs that gave up on the task's phase
    pub exhausted_repairs: AtomicU64,

    /// Admission calls rejected because the task was running
    pub busy_rejections: AtomicU64,
}

impl SchedulerStats {
    pub const fn new() -> Self {
        Self {
            passes: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            deadline_misses: AtomicU64::new(0),
            repairs: AtomicU64::new(0),
            exhausted_repairs: AtomicU64::new(0),
            busy_rejections: AtomicU64::new(0),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        if by > 0 {
            counter.fetch_add(by, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            deadline_misses: self.deadline_misses.load(Ordering::Relaxed),
            repairs: self.repairs.load(Ordering::Relaxed),
            exhausted_repairs: self.exhausted_repairs.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
        }
    }
}

impl Default for SchedulerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain copy of [`SchedulerStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub passes: u64,
    pub coalesced: u64,
    pub dispatched: u64,
    pub deadline_misses: u64,
    pub repairs: u64,
    pub exhausted_repairs: u64,
    pub busy_rejections: u64,
}
