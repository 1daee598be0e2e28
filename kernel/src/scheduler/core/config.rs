//! Scheduler configuration
//!
//! Platform constants plus `const` builders so firmware can declare its
//! configuration statically.

use super::error::{SchedError, SchedResult};
use crate::arch::{Irq, MAX_IRQS};
use crate::time::{us_to_ticks, Ticks};

/// Scheduler clock rate (SSP clock, Hz)
pub const PLATFORM_SCHED_CLOCK: u32 = 19_200_000;

/// Ticks spent between a task's nominal start and its work actually running
pub const PLATFORM_SCHEDULE_COST: Ticks = 200;

/// Software interrupt line reserved for scheduling passes
pub const PLATFORM_SCHEDULE_IRQ: Irq = Irq(7);

/// Default task table size
pub const MAX_TASKS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedConfig {
    /// Rate used to turn caller microseconds into ticks
    pub clock_rate_hz: u32,
    /// Subtracted from relative start times
    pub schedule_cost: Ticks,
    /// Line raised by `request_pass`
    pub schedule_irq: Irq,
    /// Task table capacity
    pub max_tasks: usize,
}

impl SchedConfig {
    pub const fn new(clock_rate_hz: u32) -> Self {
        Self {
            clock_rate_hz,
            schedule_cost: PLATFORM_SCHEDULE_COST,
            schedule_irq: PLATFORM_SCHEDULE_IRQ,
            max_tasks: MAX_TASKS,
        }
    }

    pub const fn with_schedule_cost(mut self, cost: Ticks) -> Self {
        self.schedule_cost = cost;
        self
    }

    pub const fn with_irq(mut self, irq: Irq) -> Self {
        self.schedule_irq = irq;
        self
    }

    pub const fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = max_tasks;
        self
    }

    /// Microseconds → ticks at the configured rate
    pub const fn to_ticks(&self, us: u64) -> Ticks {
        us_to_ticks(us, self.clock_rate_hz)
    }

    pub fn validate(&self) -> SchedResult<()> {
        if self.clock_rate_hz == 0 {
            return Err(SchedError::InvalidConfig { reason: "clock rate is zero" });
        }
        if self.max_tasks == 0 {
            return Err(SchedError::InvalidConfig { reason: "task table has no slots" });
        }
        if self.max_tasks > u32::MAX as usize {
            return Err(SchedError::InvalidConfig { reason: "task table too large" });
        }
        if self.schedule_irq.index() >= MAX_IRQS {
            return Err(SchedError::InvalidConfig { reason: "schedule irq out of range" });
        }
        Ok(())
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self::new(PLATFORM_SCHED_CLOCK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SchedConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.to_ticks(1_000), 19_200);
    }

    #[test]
    fn test_builders() {
        const CONFIG: SchedConfig = SchedConfig::new(1_000_000)
            .with_schedule_cost(0)
            .with_irq(Irq(1))
            .with_max_tasks(4);
        assert_eq!(CONFIG.schedule_cost, 0);
        assert_eq!(CONFIG.schedule_irq, Irq(1));
        assert_eq!(CONFIG.max_tasks, 4);
        assert_eq!(CONFIG.to_ticks(5), 5);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(SchedConfig::new(0).validate().is_err());
        assert!(SchedConfig::default().with_max_tasks(0).validate().is_err());
        assert!(SchedConfig::default().with_irq(Irq(200)).validate().is_err());
    }
}
