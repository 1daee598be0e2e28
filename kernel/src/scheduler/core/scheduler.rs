//! Scheduler Core - EDF driver and admission API
//!
//! One [`Scheduler`] owns the task table and the EDF queue. Bookkeeping
//! (`insert`, `cancel`, `complete`, selection) runs under one
//! [`IrqSpinLock`]; task work always runs with the lock released.
//!
//! Scheduling passes are driven by a software interrupt: anything that
//! changes the queue raises the line with [`Scheduler::request_pass`], and
//! the registered handler ([`Scheduler::run`]) performs one pass then arms
//! the deferred timer for the next task that is not yet due.

use super::config::SchedConfig;
use super::error::{SchedError, SchedResult};
use super::executor::{InlineExecutor, TaskExecutor};
use super::statistics::{SchedulerStats, StatsSnapshot};
use crate::arch::IrqController;
use crate::scheduler::realtime::edf::{self, Selection};
use crate::scheduler::table::TaskTable;
use crate::scheduler::task::{
    CancelReason, TaskConfig, TaskId, TaskRecord, TaskSnapshot, TaskState, Work, WorkStatus,
};
use crate::sync::{IrqSpinLock, IrqSpinLockGuard};
use crate::time::{ClockSource, DeferredTimer, Ticks, WakeCallback};
use alloc::boxed::Box;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

/// Collaborators the scheduler drives
#[derive(Clone)]
pub struct Platform {
    pub clock: Arc<dyn ClockSource>,
    pub irq: Arc<dyn IrqController>,
    pub timer: Arc<dyn DeferredTimer>,
    pub executor: Arc<dyn TaskExecutor>,
}

impl Platform {
    /// Platform running work inline on the scheduling context
    pub fn new(
        clock: Arc<dyn ClockSource>,
        irq: Arc<dyn IrqController>,
        timer: Arc<dyn DeferredTimer>,
    ) -> Self {
        Self {
            clock,
            irq,
            timer,
            executor: Arc::new(InlineExecutor),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = executor;
        self
    }
}

/// Result of one scheduling pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassOutcome {
    /// Task whose work ran during the pass
    pub dispatched: Option<TaskId>,
    /// Task to wake up for
    pub next: Option<TaskId>,
}

impl PassOutcome {
    pub const fn is_idle(&self) -> bool {
        self.dispatched.is_none() && self.next.is_none()
    }
}

/// Clears the in-pass flag when a pass ends
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    config: SchedConfig,
    tasks: IrqSpinLock<TaskTable>,
    clock: Arc<dyn ClockSource>,
    irq: Arc<dyn IrqController>,
    timer: Arc<dyn DeferredTimer>,
    executor: Arc<dyn TaskExecutor>,
    /// Handed to the timer; calls `on_timer_fire`
    wake: WakeCallback,
    in_pass: AtomicBool,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Build the scheduler, register and enable its interrupt line
    pub fn init(config: SchedConfig, platform: Platform) -> SchedResult<Arc<Self>> {
        config.validate()?;

        let line = config.schedule_irq;
        let sched = Arc::new_cyclic(|weak: &Weak<Self>| {
            let timer_ref = weak.clone();
            let wake: WakeCallback = Arc::new(move || {
                if let Some(sched) = timer_ref.upgrade() {
                    sched.on_timer_fire();
                }
            });

            Self {
                config,
                tasks: IrqSpinLock::new(TaskTable::with_capacity(config.max_tasks)),
                clock: platform.clock,
                irq: platform.irq,
                timer: platform.timer,
                executor: platform.executor,
                wake,
                in_pass: AtomicBool::new(false),
                stats: SchedulerStats::new(),
            }
        });

        let weak = Arc::downgrade(&sched);
        sched.irq.register(
            line,
            Arc::new(move || {
                if let Some(sched) = weak.upgrade() {
                    sched.run();
                }
            }),
        )?;
        sched.irq.enable(line);

        log::info!(
            "sched: EDF scheduler up ({} Hz, {} slots, cost {} ticks, {})",
            config.clock_rate_hz,
            config.max_tasks,
            config.schedule_cost,
            line
        );
        Ok(sched)
    }

    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    /// Current scheduler time
    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn lock(&self) -> IrqSpinLockGuard<'_, TaskTable> {
        self.tasks.lock_irq(&*self.irq)
    }

    fn busy(&self, task: TaskId) -> SchedError {
        SchedulerStats::bump(&self.stats.busy_rejections, 1);
        SchedError::Busy { task }
    }

    fn account(&self, sel: &Selection) {
        if sel.cancelled.is_some() {
            SchedulerStats::bump(&self.stats.deadline_misses, 1);
        }
        SchedulerStats::bump(&self.stats.repairs, u64::from(sel.repaired));
        SchedulerStats::bump(&self.stats.exhausted_repairs, u64::from(sel.exhausted));
    }

    // ========================================================================
    // Task lifecycle
    // ========================================================================

    /// Register a task in state `Init`
    pub fn task_init<W: Work + 'static>(&self, work: W, config: TaskConfig) -> SchedResult<TaskId> {
        let record = TaskRecord::new(Box::new(work), config);

        let result = {
            let mut tasks = self.lock();
            let capacity = tasks.capacity();
            match tasks.alloc(record) {
                Ok(task) => Ok((task, tasks.len(), capacity)),
                Err(rejected) => Err((rejected, capacity)),
            }
        };

        match result {
            Ok((task, live, capacity)) => {
                log::debug!(
                    "sched: {} registered, {}/{} slots (runtime {} ticks, prio {}, core {})",
                    task,
                    live,
                    capacity,
                    config.max_runtime,
                    config.priority,
                    config.core
                );
                Ok(task)
            }
            Err((rejected, capacity)) => {
                drop(rejected);
                log::warn!("sched: task table full ({} slots)", capacity);
                Err(SchedError::TableFull { capacity })
            }
        }
    }

    /// Replace runtime budget, priority and core of a task
    pub fn task_config(&self, task: TaskId, config: TaskConfig) -> SchedResult<()> {
        let mut tasks = self.lock();
        let record = tasks.get_mut(task).ok_or(SchedError::UnknownTask { task })?;
        if record.state.is_running() {
            return Err(self.busy(task));
        }
        record.configure(config);
        Ok(())
    }

    /// Release a task; its handle goes stale
    pub fn task_free(&self, task: TaskId) -> SchedResult<()> {
        let record = {
            let mut tasks = self.lock();
            let state = tasks.get(task).ok_or(SchedError::UnknownTask { task })?.state;
            if state.is_running() {
                return Err(self.busy(task));
            }
            tasks.release(task)
        };

        // work is dropped here, outside the lock
        drop(record);
        log::debug!("sched: {} freed", task);
        Ok(())
    }

    pub fn task(&self, task: TaskId) -> Option<TaskSnapshot> {
        let tasks = self.lock();
        let snapshot = tasks.get(task).map(|record| record.snapshot(task));
        snapshot
    }

    /// Current state of a task, or `DeadlineMissed` if the selector
    /// cancelled it for a missed slot
    pub fn check(&self, task: TaskId) -> SchedResult<TaskState> {
        let snapshot = self.task(task).ok_or(SchedError::UnknownTask { task })?;
        match (snapshot.state, snapshot.cancel_reason) {
            (TaskState::Cancelled, Some(CancelReason::DeadlineMissed)) => {
                Err(SchedError::DeadlineMissed {
                    task,
                    deadline: snapshot.timing.deadline,
                })
            }
            (state, _) => Ok(state),
        }
    }

    /// Queue contents in admission order
    pub fn queued(&self) -> Vec<TaskId> {
        let mut out = Vec::with_capacity(self.config.max_tasks);
        let tasks = self.lock();
        out.extend_from_slice(tasks.queue());
        drop(tasks);
        out
    }

    pub fn queued_len(&self) -> usize {
        self.lock().queue().len()
    }

    // ========================================================================
    // Queue API
    // ========================================================================

    /// Admit `task` for a window of `deadline_us` starting `start_us` after
    /// its previous start (0: now)
    pub fn insert(&self, task: TaskId, start_us: u64, deadline_us: u64) -> SchedResult<()> {
        let window = self.config.to_ticks(deadline_us);

        let (start, deadline) = {
            let mut tasks = self.lock();
            let record = tasks.get_mut(task).ok_or(SchedError::UnknownTask { task })?;
            if record.state.is_running() {
                return Err(self.busy(task));
            }

            let start = if start_us == 0 {
                self.clock.now()
            } else {
                record
                    .timing
                    .start
                    .saturating_add(self.config.to_ticks(start_us))
                    .saturating_sub(self.config.schedule_cost)
            };
            let deadline = start.saturating_add(window);
            if deadline <= start {
                return Err(SchedError::InvalidWindow { task, deadline_us });
            }

            record.timing.start = start;
            record.timing.deadline = deadline;
            record.set_state(TaskState::Queued);
            tasks.enqueue(task);
            (start, deadline)
        };

        log::debug!("sched: {} queued for {}..{}", task, start, deadline);
        self.request_pass();
        Ok(())
    }

    /// Withdraw a task that has not started
    pub fn cancel(&self, task: TaskId) -> SchedResult<()> {
        let mut tasks = self.lock();
        let record = tasks.get_mut(task).ok_or(SchedError::UnknownTask { task })?;
        if record.state.is_running() {
            return Err(self.busy(task));
        }
        record.cancel(CancelReason::Caller);
        tasks.dequeue(task);
        Ok(())
    }

    /// Mark a task done and drop it from the queue
    pub fn complete(&self, task: TaskId) -> SchedResult<()> {
        let mut tasks = self.lock();
        let record = tasks.get_mut(task).ok_or(SchedError::UnknownTask { task })?;
        record.set_state(TaskState::Completed);
        tasks.dequeue(task);
        Ok(())
    }

    // ========================================================================
    // Driver
    // ========================================================================

    /// Ask for a scheduling pass. Safe from interrupt context; requests
    /// coalesce until the pass runs.
    pub fn request_pass(&self) {
        self.irq.request(self.config.schedule_irq);
    }

    /// Deferred timer expiry
    pub fn on_timer_fire(&self) {
        self.request_pass();
    }

    /// Scheduling interrupt handler: one pass, then arm for the next task
    pub fn run(&self) -> PassOutcome {
        let outcome = self.run_pass();

        if let Some(next) = outcome.next {
            let start = {
                let tasks = self.lock();
                let start = tasks
                    .get(next)
                    .filter(|record| record.state == TaskState::Queued)
                    .map(|record| record.timing.start);
                start
            };

            if let Some(start) = start {
                log::trace!("sched: wake for {} at {}", next, start);
                self.timer.arm_at(start, self.wake.clone());
            }
        }

        outcome
    }

    /// Select, dispatch at most one due task, and report what to wake for
    pub fn run_pass(&self) -> PassOutcome {
        if self.in_pass.swap(true, Ordering::AcqRel) {
            SchedulerStats::bump(&self.stats.coalesced, 1);
            self.request_pass();
            return PassOutcome::default();
        }
        let _pass = PassGuard(&self.in_pass);

        SchedulerStats::bump(&self.stats.passes, 1);
        // A request raised from here on triggers another pass
        self.irq.clear(self.config.schedule_irq);

        let (current, selected) = {
            let mut tasks = self.lock();
            let current = self.clock.now();
            let sel = edf::select(&mut tasks, current);
            let selected = sel
                .next
                .and_then(|task| tasks.get(task).map(|record| (task, record.timing.start)));
            drop(tasks);
            self.account(&sel);
            (current, selected)
        };

        let Some((task, start)) = selected else {
            log::trace!("sched: pass at {}: idle", current);
            return PassOutcome::default();
        };

        if start > current {
            log::trace!("sched: pass at {}: {} due at {}", current, task, start);
            return PassOutcome {
                dispatched: None,
                next: Some(task),
            };
        }

        let (work, next) = {
            let mut tasks = self.lock();
            let Some(record) = tasks
                .get_mut(task)
                .filter(|record| record.state == TaskState::Queued && record.timing.start <= current)
            else {
                // re-timed, cancelled or completed between the two lock sections
                self.request_pass();
                return PassOutcome::default();
            };

            record.timing.start = current;
            record.set_state(TaskState::Running);
            let work = record.work.take();

            let sel = edf::select(&mut tasks, current);
            drop(tasks);
            self.account(&sel);
            (work, sel.next)
        };

        SchedulerStats::bump(&self.stats.dispatched, 1);
        log::trace!("sched: dispatch {} at {}", task, current);

        let (work, status) = match work {
            Some(mut work) => {
                let status = self.executor.execute(task, work.as_mut());
                (Some(work), status)
            }
            None => {
                log::error!("sched: {} has no work attached", task);
                (None, WorkStatus::Done)
            }
        };

        self.finish(task, work, status);

        PassOutcome {
            dispatched: Some(task),
            next,
        }
    }

    /// Put the work back and complete the task, then honour a reschedule
    fn finish(&self, task: TaskId, work: Option<Box<dyn Work>>, status: WorkStatus) {
        let mut orphan = None;

        let still_running = {
            let mut tasks = self.lock();
            match tasks.get_mut(task) {
                Some(record) => {
                    record.work = work;
                    let running = record.state.is_running();
                    if running {
                        record.set_state(TaskState::Completed);
                        tasks.dequeue(task);
                    }
                    running
                }
                None => {
                    orphan = work;
                    false
                }
            }
        };
        drop(orphan);

        if !still_running {
            // completed or freed by someone else while the work ran
            log::debug!("sched: {} changed state while running", task);
            return;
        }

        if let WorkStatus::Reschedule {
            start_us,
            deadline_us,
        } = status
        {
            if let Err(err) = self.insert(task, start_us, deadline_us) {
                log::warn!("sched: {} not rescheduled: {}", task, err);
            }
        }
    }
}
