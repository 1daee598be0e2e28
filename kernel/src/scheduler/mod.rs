//! Scheduler subsystem
//!
//! Single-core earliest-deadline-first scheduler: tasks are admitted with a
//! start/deadline window, the task whose `deadline - max_runtime` is nearest
//! runs first, and late tasks are cancelled or realigned.

pub mod core;
pub mod realtime;
pub mod task;
pub(crate) mod table;

// Re-exports
pub use self::core::{
    InlineExecutor, PassOutcome, Platform, SchedConfig, SchedError, SchedResult, Scheduler,
    SchedulerStats, StatsSnapshot, TaskExecutor, MAX_TASKS, PLATFORM_SCHEDULE_COST,
    PLATFORM_SCHEDULE_IRQ, PLATFORM_SCHED_CLOCK,
};
pub use realtime::{realign, Realignment, SLOT_ALIGN_TRIES};
pub use task::{
    CancelReason, TaskConfig, TaskId, TaskSnapshot, TaskState, TaskTiming, Work, WorkStatus,
};
