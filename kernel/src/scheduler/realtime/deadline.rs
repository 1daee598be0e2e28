//! Deadline-miss recovery
//!
//! Recomputes the window of a task that missed its slot. The task is first
//! pushed forward by whole windows so it keeps its periodic phase; if it
//! slipped too far to realign within [`SLOT_ALIGN_TRIES`] steps it is simply
//! placed one window after `current`.

use crate::scheduler::task::TaskTiming;
use crate::time::Ticks;

/// Upper bound on realignment steps (runs with interrupts masked)
pub const SLOT_ALIGN_TRIES: u32 = 10;

/// Result of [`realign`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Realignment {
    /// Realigned on the task's slot grid after `attempts` steps
    Aligned { attempts: u32 },
    /// Too far behind; restarted relative to `current`
    Exhausted,
}

impl Realignment {
    pub const fn is_exhausted(self) -> bool {
        matches!(self, Realignment::Exhausted)
    }
}

/// Give a late task a new `start`/`deadline`.
///
/// With `window = 2 × (deadline − start)` the result always satisfies
/// `deadline == start + window`. Near the end of the tick range the start is
/// capped at `Ticks::MAX - window` so the deadline stays representable.
pub fn realign(timing: &mut TaskTiming, current: Ticks) -> Realignment {
    let window = timing.window().saturating_mul(2);
    let latest = Ticks::MAX - window;
    let horizon = current.saturating_add(window).min(latest);

    for attempt in 1..=SLOT_ALIGN_TRIES {
        timing.start = timing.start.saturating_add(window);
        if timing.start > latest {
            break;
        }

        if timing.start > horizon {
            timing.deadline = timing.start.saturating_add(window);
            return Realignment::Aligned { attempts: attempt };
        }
    }

    timing.start = horizon;
    timing.deadline = timing.start.saturating_add(window);
    Realignment::Exhausted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn timing(start: Ticks, deadline: Ticks) -> TaskTiming {
        TaskTiming { start, deadline, max_runtime: 0 }
    }

    #[test]
    fn test_small_slip_keeps_phase() {
        // window = 200, horizon = 350 + 200 = 550
        let mut t = timing(100, 200);
        let result = realign(&mut t, 350);
        assert_eq!(result, Realignment::Aligned { attempts: 3 });
        assert_eq!(t.start, 700);
        assert_eq!(t.deadline, 900);
    }

    #[test]
    fn test_large_slip_restarts_from_current() {
        let mut t = timing(0, 10);
        let result = realign(&mut t, 1_000_000);
        assert!(result.is_exhausted());
        assert_eq!(t.start, 1_000_020);
        assert_eq!(t.deadline, 1_000_040);
    }

    #[test]
    fn test_exact_boundary_is_not_far_enough() {
        // start lands exactly on current + window after one step: not accepted
        let mut t = timing(0, 50);
        let result = realign(&mut t, 0);
        assert_eq!(result, Realignment::Aligned { attempts: 2 });
        assert_eq!(t.start, 200);
        assert_eq!(t.deadline, 300);
    }

    #[test]
    fn test_end_of_tick_range_keeps_window() {
        let mut t = timing(Ticks::MAX - 100, Ticks::MAX - 50);
        let result = realign(&mut t, Ticks::MAX - 60);
        assert!(result.is_exhausted());
        assert_eq!(t.start, Ticks::MAX - 100);
        assert_eq!(t.deadline, Ticks::MAX);
        assert!(t.deadline > t.start);
    }

    proptest! {
        #[test]
        fn prop_window_doubles(
            start in 0u64..1_000_000,
            len in 1u64..10_000,
            lag in 0u64..10_000_000,
        ) {
            let before = timing(start, start + len);
            let current = before.effective_deadline() + lag;
            let mut after = before;
            let result = realign(&mut after, current);

            prop_assert_eq!(after.deadline, after.start + 2 * len);
            prop_assert!(after.deadline > after.start);
            prop_assert!(after.start > current);
            if let Realignment::Aligned { attempts } = result {
                prop_assert!(attempts >= 1 && attempts <= SLOT_ALIGN_TRIES);
                prop_assert_eq!(after.start, start + u64::from(attempts) * 2 * len);
            }
        }
    }
}
