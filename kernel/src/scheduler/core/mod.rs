//! Scheduler core module
//!
//! - `scheduler`: EDF driver and admission API
//! - `config`: platform constants and `SchedConfig`
//! - `error`: `SchedError` and recovery hints
//! - `executor`: task-execution collaborator
//! - `statistics`: lock-free counters

pub mod config;
pub mod error;
pub mod executor;
pub mod scheduler;
pub mod statistics;

pub use config::{
    SchedConfig, MAX_TASKS, PLATFORM_SCHEDULE_COST, PLATFORM_SCHEDULE_IRQ, PLATFORM_SCHED_CLOCK,
};
pub use error::{SchedError, SchedResult};
pub use executor::{InlineExecutor, TaskExecutor};
pub use scheduler::{PassOutcome, Platform, Scheduler};
pub use statistics::{SchedulerStats, StatsSnapshot};
