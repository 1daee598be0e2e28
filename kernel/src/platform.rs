//! Software platform
//!
//! Bundles the software clock, interrupt controller and timer so the
//! scheduler can run on a host: `advance` moves time forward, `step`
//! delivers whatever became due.

use crate::arch::SoftIrqController;
use crate::scheduler::{InlineExecutor, Platform};
use crate::time::{ClockSource, ManualClock, SoftTimer, Ticks};
use alloc::sync::Arc;

/// Upper bound on timer/interrupt rounds per `step`
pub const MAX_STEP_ROUNDS: usize = 64;

#[derive(Clone)]
pub struct SoftPlatform {
    pub clock: Arc<ManualClock>,
    pub irq: Arc<SoftIrqController>,
    pub timer: Arc<SoftTimer>,
}

impl SoftPlatform {
    pub fn new(start: Ticks) -> Self {
        Self {
            clock: Arc::new(ManualClock::new(start)),
            irq: Arc::new(SoftIrqController::new()),
            timer: Arc::new(SoftTimer::new()),
        }
    }

    /// Collaborators for `Scheduler::init`
    pub fn platform(&self) -> Platform {
        Platform {
            clock: self.clock.clone(),
            irq: self.irq.clone(),
            timer: self.timer.clone(),
            executor: Arc::new(InlineExecutor),
        }
    }

    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    /// Fire the timer if due and deliver pending interrupts until nothing
    /// is left. Returns the number of handlers run.
    pub fn step(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_STEP_ROUNDS {
            let fired = self.timer.poll(self.clock.now());
            let ran = self.irq.dispatch();
            delivered += ran;
            if ran == 0 && !fired {
                break;
            }
        }
        delivered
    }

    /// Move time forward by `delta` ticks, then `step`
    pub fn advance(&self, delta: Ticks) -> usize {
        self.clock.advance(delta);
        self.step()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Irq, IrqController};
    use crate::time::DeferredTimer;
    use core::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_step_delivers_timer_wakeup() {
        let soft = SoftPlatform::new(0);
        let hits = Arc::new(AtomicU32::new(0));
        let seen = hits.clone();
        let irq = soft.irq.clone();
        soft.irq
            .register(
                Irq(3),
                Arc::new(move || {
                    irq.clear(Irq(3));
                    seen.fetch_add(1, Ordering::Relaxed);
                }),
            )
            .unwrap();
        soft.irq.enable(Irq(3));

        let raise = soft.irq.clone();
        soft.timer.arm_at(50, Arc::new(move || raise.request(Irq(3))));

        assert_eq!(soft.step(), 0);
        assert_eq!(soft.advance(50), 1);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(soft.step(), 0);
    }

    #[test]
    fn test_step_is_bounded() {
        let soft = SoftPlatform::new(0);
        let irq = soft.irq.clone();
        // handler that keeps re-raising its own line
        soft.irq
            .register(Irq(1), Arc::new(move || irq.request(Irq(1))))
            .unwrap();
        soft.irq.enable(Irq(1));
        soft.irq.request(Irq(1));
        assert_eq!(soft.step(), MAX_STEP_ROUNDS);
    }
}
