//! Scheduler Error Handling
//!
//! Typed errors for every admission and lifecycle operation, with recovery
//! hints. Deadline misses are normally observed through task state; the
//! `DeadlineMissed` variant exists for callers that poll with
//! `Scheduler::check`.

use crate::arch::IrqError;
use crate::scheduler::task::TaskId;
use crate::time::Ticks;
use core::fmt;

/// Scheduler error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Task is running; it can be neither removed nor re-admitted
    Busy { task: TaskId },

    /// Handle does not name a live task
    UnknownTask { task: TaskId },

    /// Every task slot is in use
    TableFull { capacity: usize },

    /// Requested window converts to zero ticks
    InvalidWindow { task: TaskId, deadline_us: u64 },

    /// The selector cancelled the task because its slot had elapsed
    DeadlineMissed { task: TaskId, deadline: Ticks },

    /// Configuration rejected at init
    InvalidConfig { reason: &'static str },

    /// Interrupt controller refused the scheduling line
    Irq(IrqError),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy { task } => write!(f, "{} is running", task),
            Self::UnknownTask { task } => write!(f, "{} is not a live task", task),
            Self::TableFull { capacity } => {
                write!(f, "task table full ({} slots)", capacity)
            }
            Self::InvalidWindow { task, deadline_us } => {
                write!(f, "{}: {}us deadline is shorter than one tick", task, deadline_us)
            }
            Self::DeadlineMissed { task, deadline } => {
                write!(f, "{} missed its deadline ({})", task, deadline)
            }
            Self::InvalidConfig { reason } => write!(f, "invalid scheduler config: {}", reason),
            Self::Irq(err) => write!(f, "scheduler irq: {}", err),
        }
    }
}

impl From<IrqError> for SchedError {
    fn from(err: IrqError) -> Self {
        Self::Irq(err)
    }
}

impl SchedError {
    /// Get recovery hint
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::Busy { .. } => "Wait for the task to complete, then retry",
            Self::UnknownTask { .. } => "Handle is stale; re-initialize the task",
            Self::TableFull { .. } => "Free unused tasks or raise max_tasks",
            Self::InvalidWindow { .. } => "Use a deadline of at least one clock tick",
            Self::DeadlineMissed { .. } => "Report an xrun and re-admit the task",
            Self::InvalidConfig { .. } | Self::Irq(_) => "Check scheduler configuration",
        }
    }

    /// Can the caller carry on after this error?
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidConfig { .. } | Self::Irq(_))
    }

    /// Get error severity (0-3)
    pub fn severity(&self) -> u8 {
        match self {
            Self::InvalidConfig { .. } | Self::Irq(_) => 3,
            Self::DeadlineMissed { .. } | Self::TableFull { .. } => 2,
            Self::InvalidWindow { .. } | Self::UnknownTask { .. } => 1,
            Self::Busy { .. } => 0,
        }
    }
}

/// Result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;
