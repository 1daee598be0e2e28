//! Pipeline scheduling
//!
//! An audio pipeline owns one scheduler task whose work runs the pipeline
//! copy. Timer-driven pipelines reschedule themselves one period after each
//! copy while active. Over/under-runs are reported to the host through an
//! [`XrunSink`], once per start so a stalled pipeline does not flood it.

use crate::scheduler::{
    SchedError, SchedResult, Scheduler, TaskConfig, TaskId, TaskState, WorkStatus,
};
use crate::time::Ticks;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

/// Host notification channel for xruns
pub trait XrunSink: Send + Sync {
    fn xrun(&self, pipeline: u32, bytes: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineDesc {
    pub id: u32,
    /// Period and deadline of one copy
    pub deadline_us: u64,
    pub max_runtime: Ticks,
    pub priority: u16,
    pub core: u8,
    /// Reschedules itself every period instead of waiting for DMA
    pub timer_driven: bool,
}

impl PipelineDesc {
    pub const fn new(id: u32, deadline_us: u64) -> Self {
        Self {
            id,
            deadline_us,
            max_runtime: 0,
            priority: 0,
            core: 0,
            timer_driven: false,
        }
    }

    pub const fn timer_driven(mut self) -> Self {
        self.timer_driven = true;
        self
    }

    pub const fn with_max_runtime(mut self, max_runtime: Ticks) -> Self {
        self.max_runtime = max_runtime;
        self
    }

    const fn task_config(&self) -> TaskConfig {
        TaskConfig::new(self.max_runtime)
            .with_priority(self.priority)
            .with_core(self.core)
    }
}

/// Pipeline trigger commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineCmd {
    Start,
    Release,
    Pause,
    Stop,
    Suspend,
    Resume,
}

/// State shared with the pipeline task's work
struct Shared {
    desc: PipelineDesc,
    active: AtomicBool,
    xrun_reported: AtomicBool,
}

pub struct Pipeline {
    scheduler: Arc<Scheduler>,
    task: TaskId,
    shared: Arc<Shared>,
    sink: Arc<dyn XrunSink>,
}

impl Pipeline {
    /// Create the pipeline task; `copy` runs once per scheduled period
    pub fn new<F>(
        scheduler: Arc<Scheduler>,
        desc: PipelineDesc,
        mut copy: F,
        sink: Arc<dyn XrunSink>,
    ) -> SchedResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(Shared {
            desc,
            active: AtomicBool::new(false),
            xrun_reported: AtomicBool::new(false),
        });

        let state = shared.clone();
        let work = move |_: TaskId| {
            copy();
            if state.desc.timer_driven && state.active.load(Ordering::Acquire) {
                WorkStatus::Reschedule {
                    start_us: state.desc.deadline_us,
                    deadline_us: state.desc.deadline_us,
                }
            } else {
                WorkStatus::Done
            }
        };

        let task = scheduler.task_init(work, desc.task_config())?;
        log::debug!("pipe{}: created on {}", desc.id, task);

        Ok(Self {
            scheduler,
            task,
            shared,
            sink,
        })
    }

    pub fn id(&self) -> u32 {
        self.shared.desc.id
    }

    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn desc(&self) -> &PipelineDesc {
        &self.shared.desc
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    pub fn cmd(&self, cmd: PipelineCmd) -> SchedResult<()> {
        log::debug!("pipe{}: {:?}", self.id(), cmd);

        match cmd {
            PipelineCmd::Start | PipelineCmd::Release => {
                self.shared.xrun_reported.store(false, Ordering::Release);
                self.shared.active.store(true, Ordering::Release);
                if self.shared.desc.timer_driven {
                    self.schedule_copy(0)?;
                }
                Ok(())
            }
            PipelineCmd::Pause | PipelineCmd::Stop => {
                self.shared.active.store(false, Ordering::Release);
                self.scheduler.complete(self.task)
            }
            PipelineCmd::Suspend | PipelineCmd::Resume => Ok(()),
        }
    }

    /// Queue the next copy `start_us` after the previous one (0: now)
    pub fn schedule_copy(&self, start_us: u64) -> SchedResult<()> {
        if !self.is_active() {
            return Ok(());
        }
        self.scheduler
            .insert(self.task, start_us, self.shared.desc.deadline_us)
    }

    /// Report an xrun of `bytes`; returns whether the host was notified
    pub fn xrun(&self, bytes: u32) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.shared.xrun_reported.swap(true, Ordering::AcqRel) {
            return false;
        }

        log::warn!("pipe{}: xrun of {} bytes", self.id(), bytes);
        self.sink.xrun(self.id(), bytes);
        true
    }

    /// Turn a deadline-miss cancellation of the pipeline task into an xrun
    pub fn check_deadline(&self) -> bool {
        match self.scheduler.check(self.task) {
            Err(SchedError::DeadlineMissed { .. }) => self.xrun(0),
            _ => false,
        }
    }

    /// Release the pipeline task; refused while the pipeline is active
    pub fn free(&self) -> SchedResult<()> {
        if self.is_active() {
            return Err(SchedError::Busy { task: self.task });
        }
        self.scheduler.task_free(self.task)
    }

    pub fn state(&self) -> Option<TaskState> {
        self.scheduler.task(self.task).map(|snapshot| snapshot.state)
    }
}
