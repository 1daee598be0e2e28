//! Task execution
//!
//! The scheduler hands a due task's work to a [`TaskExecutor`] and blocks
//! until it returns.

use crate::scheduler::task::{TaskId, Work, WorkStatus};

/// Task-execution collaborator
pub trait TaskExecutor: Send + Sync {
    /// Run `work` for `task` synchronously to completion
    fn execute(&self, task: TaskId, work: &mut dyn Work) -> WorkStatus;
}

/// Runs work directly on the scheduling context
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn execute(&self, task: TaskId, work: &mut dyn Work) -> WorkStatus {
        work.run(task)
    }
}
