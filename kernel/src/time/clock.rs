//! Scheduler clock
//!
//! Monotonic tick source plus microsecond → tick conversion.

use core::sync::atomic::{AtomicU64, Ordering};

/// Absolute platform time in timer ticks
pub type Ticks = u64;

/// Monotonic, interrupt-safe tick source
pub trait ClockSource: Send + Sync {
    /// Current platform time
    fn now(&self) -> Ticks;
}

/// Convert microseconds into ticks of a clock running at `rate_hz`.
///
/// Saturates at `Ticks::MAX` instead of wrapping.
pub const fn us_to_ticks(us: u64, rate_hz: u32) -> Ticks {
    let ticks = (us as u128 * rate_hz as u128) / 1_000_000;
    if ticks > Ticks::MAX as u128 {
        Ticks::MAX
    } else {
        ticks as Ticks
    }
}

/// Software clock driven explicitly by its owner
///
/// Used by host simulation and tests; firmware builds plug the wall-clock
/// timer behind [`ClockSource`] instead.
pub struct ManualClock {
    ticks: AtomicU64,
}

impl ManualClock {
    pub const fn new(start: Ticks) -> Self {
        Self {
            ticks: AtomicU64::new(start),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, ticks: Ticks) {
        self.ticks.store(ticks, Ordering::Release);
    }

    /// Move time forward, returns the new time
    pub fn advance(&self, delta: Ticks) -> Ticks {
        let prev = self
            .ticks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(delta))
            })
            .unwrap_or_else(|t| t);
        prev.saturating_add(delta)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Ticks {
        self.ticks.load(Ordering::Acquire)
    }
}
