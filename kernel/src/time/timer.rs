//! Deferred wakeups
//!
//! A single armed callback per timer: arming again before expiry replaces
//! the previous arming. The scheduler uses one of these to come back when
//! the next task's start time is reached.

use super::clock::Ticks;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

/// Callback invoked when an armed wakeup elapses
pub type WakeCallback = Arc<dyn Fn() + Send + Sync>;

/// Deferred-callback collaborator
pub trait DeferredTimer: Send + Sync {
    /// Invoke `callback` once at or after `at`, replacing any previous arming
    fn arm_at(&self, at: Ticks, callback: WakeCallback);

    /// Drop the current arming, if any
    fn disarm(&self);
}

/// Armed wakeup
struct Armed {
    at: Ticks,
    callback: WakeCallback,
}

/// Software one-shot timer
///
/// Nothing fires on its own: the owner calls [`SoftTimer::poll`] from its
/// tick source (or a test advances time and polls).
pub struct SoftTimer {
    slot: Mutex<Option<Armed>>,
    fired: AtomicU64,
    armings: AtomicU64,
}

impl SoftTimer {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            fired: AtomicU64::new(0),
            armings: AtomicU64::new(0),
        }
    }

    /// Time of the pending wakeup
    pub fn armed_at(&self) -> Option<Ticks> {
        self.slot.lock().as_ref().map(|a| a.at)
    }

    /// Fire the pending wakeup if it is due at `now`.
    ///
    /// The callback runs after the slot lock is released so it may re-arm.
    pub fn poll(&self, now: Ticks) -> bool {
        let due = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(armed) if now >= armed.at => slot.take(),
                _ => None,
            }
        };

        match due {
            Some(armed) => {
                self.fired.fetch_add(1, Ordering::Relaxed);
                (armed.callback)();
                true
            }
            None => false,
        }
    }

    /// Number of wakeups delivered so far
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Number of times the timer was armed
    pub fn armings(&self) -> u64 {
        self.armings.load(Ordering::Relaxed)
    }
}

impl Default for SoftTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferredTimer for SoftTimer {
    fn arm_at(&self, at: Ticks, callback: WakeCallback) {
        self.armings.fetch_add(1, Ordering::Relaxed);
        *self.slot.lock() = Some(Armed { at, callback });
    }

    fn disarm(&self) {
        self.slot.lock().take();
    }
}
