//! Scheduler tasks
//!
//! A task is a unit of work with a start/deadline window. The scheduler owns
//! the task record; callers hold a [`TaskId`] and observe the task through
//! [`TaskSnapshot`]s.

use crate::time::Ticks;
use alloc::boxed::Box;
use core::fmt;

/// Task handle (slot index + generation)
///
/// The generation changes every time a slot is reused, so a handle to a
/// freed task never aliases a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    index: u32,
    generation: u32,
}

impl TaskId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn index(&self) -> u32 {
        self.index
    }

    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task{}.{}", self.index, self.generation)
    }
}

/// Task state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Initialized, never admitted
    Init,
    /// In the queue, waiting for selection
    Queued,
    /// Dispatched, work is executing
    Running,
    /// Work finished (or completed early by its owner)
    Completed,
    /// Removed before running
    Cancelled,
}

impl TaskState {
    /// Running tasks can neither be removed nor re-admitted
    pub const fn is_running(self) -> bool {
        matches!(self, TaskState::Running)
    }
}

/// Why a task ended up `Cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Its owner called `cancel`
    Caller,
    /// The selector found its effective deadline already elapsed
    DeadlineMissed,
}

/// What the work asks the scheduler to do once it returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// Nothing more to do; the task stays `Completed`
    Done,
    /// Re-admit the task with the given offsets (see `Scheduler::insert`)
    Reschedule { start_us: u64, deadline_us: u64 },
}

/// Opaque unit of execution
///
/// Runs synchronously to completion on the scheduling context.
pub trait Work: Send {
    fn run(&mut self, task: TaskId) -> WorkStatus;
}

impl<F> Work for F
where
    F: FnMut(TaskId) -> WorkStatus + Send,
{
    fn run(&mut self, task: TaskId) -> WorkStatus {
        self(task)
    }
}

/// Static task configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskConfig {
    /// Worst-case execution time in ticks (advisory, not enforced)
    pub max_runtime: Ticks,
    /// Recorded for the owner; EDF ignores it
    pub priority: u16,
    /// Recorded for the owner; single-core scheduler ignores it
    pub core: u8,
}

impl TaskConfig {
    pub const fn new(max_runtime: Ticks) -> Self {
        Self {
            max_runtime,
            priority: 0,
            core: 0,
        }
    }

    pub const fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub const fn with_core(mut self, core: u8) -> Self {
        self.core = core;
        self
    }
}

/// Scheduling window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskTiming {
    /// Earliest start (absolute ticks)
    pub start: Ticks,
    /// Must be finished by (absolute ticks)
    pub deadline: Ticks,
    /// Worst-case execution time (ticks)
    pub max_runtime: Ticks,
}

impl TaskTiming {
    /// Latest start that still meets the deadline
    pub const fn effective_deadline(&self) -> Ticks {
        self.deadline.saturating_sub(self.max_runtime)
    }

    /// Has the task missed its slot at `current`?
    pub const fn is_missed(&self, current: Ticks) -> bool {
        current >= self.effective_deadline()
    }

    pub const fn window(&self) -> Ticks {
        self.deadline.saturating_sub(self.start)
    }
}

/// Read-only view of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub state: TaskState,
    pub timing: TaskTiming,
    pub priority: u16,
    pub core: u8,
    pub cancel_reason: Option<CancelReason>,
    pub missed_deadlines: u32,
}

/// Task record owned by the task table
pub(crate) struct TaskRecord {
    pub state: TaskState,
    pub timing: TaskTiming,
    pub priority: u16,
    pub core: u8,
    pub cancel_reason: Option<CancelReason>,
    pub missed_deadlines: u32,
    /// `None` only while the work is executing
    pub work: Option<Box<dyn Work>>,
}

impl TaskRecord {
    pub fn new(work: Box<dyn Work>, config: TaskConfig) -> Self {
        Self {
            state: TaskState::Init,
            timing: TaskTiming {
                start: 0,
                deadline: 0,
                max_runtime: config.max_runtime,
            },
            priority: config.priority,
            core: config.core,
            cancel_reason: None,
            missed_deadlines: 0,
            work: Some(work),
        }
    }

    pub fn configure(&mut self, config: TaskConfig) {
        self.timing.max_runtime = config.max_runtime;
        self.priority = config.priority;
        self.core = config.core;
    }

    pub fn set_state(&mut self, state: TaskState) {
        self.state = state;
        if state != TaskState::Cancelled {
            self.cancel_reason = None;
        }
    }

    pub fn cancel(&mut self, reason: CancelReason) {
        self.state = TaskState::Cancelled;
        self.cancel_reason = Some(reason);
        if reason == CancelReason::DeadlineMissed {
            self.missed_deadlines = self.missed_deadlines.saturating_add(1);
        }
    }

    pub fn snapshot(&self, id: TaskId) -> TaskSnapshot {
        TaskSnapshot {
            id,
            state: self.state,
            timing: self.timing,
            priority: self.priority,
            core: self.core,
            cancel_reason: self.cancel_reason,
            missed_deadlines: self.missed_deadlines,
        }
    }
}
