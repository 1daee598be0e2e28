//! End-to-end scheduling scenarios on the software platform

use reef_kernel::scheduler::{CancelReason, PLATFORM_SCHEDULE_IRQ};
use reef_kernel::{
    PassOutcome, SchedConfig, SchedError, Scheduler, SoftPlatform, TaskConfig, TaskId, TaskState,
    WorkStatus,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

fn done(_: TaskId) -> WorkStatus {
    WorkStatus::Done
}

/// Scheduler at the platform defaults (19.2 MHz, 200 ticks of scheduling cost)
fn boot() -> (SoftPlatform, Arc<Scheduler>) {
    let soft = SoftPlatform::new(0);
    let sched = Scheduler::init(SchedConfig::default(), soft.platform()).unwrap();
    (soft, sched)
}

fn counting(runs: &Arc<AtomicU32>) -> impl FnMut(TaskId) -> WorkStatus + Send + 'static {
    let runs = runs.clone();
    move |_| {
        runs.fetch_add(1, Ordering::SeqCst);
        WorkStatus::Done
    }
}

#[test]
fn immediate_task_dispatched_alone() {
    let (soft, sched) = boot();
    let runs = Arc::new(AtomicU32::new(0));
    let a = sched.task_init(counting(&runs), TaskConfig::new(0)).unwrap();

    sched.insert(a, 0, 1_000).unwrap();
    let outcome = sched.run();

    assert_eq!(outcome, PassOutcome { dispatched: Some(a), next: None });
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    let snap = sched.task(a).unwrap();
    assert_eq!(snap.timing.start, 0);
    assert_eq!(snap.state, TaskState::Completed);
    assert_eq!(soft.timer.armed_at(), None);
}

#[test]
fn future_task_arms_wakeup() {
    let (soft, sched) = boot();
    let runs = Arc::new(AtomicU32::new(0));
    let b = sched.task_init(counting(&runs), TaskConfig::new(0)).unwrap();

    sched.insert(b, 5_000, 1_000).unwrap();
    let before = sched.task(b).unwrap().timing;
    // 5 ms at 19.2 MHz, minus the scheduling cost
    assert_eq!(before.start, 96_000 - 200);

    let outcome = sched.run();
    assert_eq!(outcome, PassOutcome { dispatched: None, next: Some(b) });
    assert_eq!(sched.task(b).unwrap().timing, before);
    assert_eq!(sched.task(b).unwrap().state, TaskState::Queued);
    assert_eq!(soft.timer.armed_at(), Some(before.start));
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    // nothing happens before the wakeup
    soft.advance(before.start - 1);
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    soft.advance(1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(sched.task(b).unwrap().state, TaskState::Completed);
}

#[test]
fn dispatch_reports_next_task() {
    let (soft, sched) = boot();
    let a = sched.task_init(done, TaskConfig::new(0)).unwrap();
    let b = sched.task_init(done, TaskConfig::new(0)).unwrap();
    sched.insert(a, 0, 1_000).unwrap();
    sched.insert(b, 5_000, 1_000).unwrap();

    let outcome = sched.run();
    assert_eq!(outcome, PassOutcome { dispatched: Some(a), next: Some(b) });
    assert_eq!(soft.timer.armed_at(), Some(sched.task(b).unwrap().timing.start));
}

#[test]
fn interrupt_driven_flow() {
    let (soft, sched) = boot();
    let runs = Arc::new(AtomicU32::new(0));
    let a = sched.task_init(counting(&runs), TaskConfig::new(0)).unwrap();

    sched.insert(a, 0, 1_000).unwrap();
    assert!(soft.irq.is_pending(PLATFORM_SCHEDULE_IRQ));
    soft.step();

    assert!(!soft.irq.is_pending(PLATFORM_SCHEDULE_IRQ));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(sched.stats().dispatched, 1);
}

#[test]
fn first_miss_cancelled_second_repaired() {
    let (soft, sched) = boot();
    let t1 = sched.task_init(done, TaskConfig::new(0)).unwrap();
    let t2 = sched.task_init(done, TaskConfig::new(0)).unwrap();
    sched.insert(t1, 0, 1_000).unwrap();
    sched.insert(t2, 0, 1_000).unwrap();

    soft.clock.set(30_000);
    let outcome = sched.run_pass();
    assert_eq!(outcome.dispatched, None);

    let s1 = sched.task(t1).unwrap();
    assert_eq!(s1.state, TaskState::Cancelled);
    assert_eq!(s1.cancel_reason, Some(CancelReason::DeadlineMissed));
    assert_eq!(s1.missed_deadlines, 1);
    assert_eq!(
        sched.check(t1),
        Err(SchedError::DeadlineMissed { task: t1, deadline: 19_200 })
    );

    // window 2 × 19_200, realigned past 30_000 + 38_400
    let s2 = sched.task(t2).unwrap();
    assert_eq!(s2.state, TaskState::Queued);
    assert_eq!((s2.timing.start, s2.timing.deadline), (76_800, 115_200));
    assert_eq!(sched.queued(), vec![t2]);

    let stats = sched.stats();
    assert_eq!(stats.deadline_misses, 1);
    assert_eq!(stats.repairs, 1);
}

#[test]
fn cancel_of_running_task_is_busy() {
    let (_soft, sched) = boot();
    let seen = Arc::new(Mutex::new(None));
    let handle: Arc<Mutex<Option<Arc<Scheduler>>>> = Arc::new(Mutex::new(None));

    let out = seen.clone();
    let me = handle.clone();
    let t = sched
        .task_init(
            move |id: TaskId| {
                let sched = me.lock().unwrap().clone();
                if let Some(sched) = sched {
                    *out.lock().unwrap() = Some((sched.cancel(id), sched.task(id).map(|s| s.state)));
                }
                WorkStatus::Done
            },
            TaskConfig::new(0),
        )
        .unwrap();
    *handle.lock().unwrap() = Some(sched.clone());

    sched.insert(t, 0, 1_000).unwrap();
    sched.run_pass();

    let (result, state) = seen.lock().unwrap().take().unwrap();
    assert_eq!(result, Err(SchedError::Busy { task: t }));
    assert_eq!(state, Some(TaskState::Running));
    *handle.lock().unwrap() = None;
}

#[test]
fn complete_after_cancel_keeps_queue_intact() {
    let (_soft, sched) = boot();
    let a = sched.task_init(done, TaskConfig::new(0)).unwrap();
    let b = sched.task_init(done, TaskConfig::new(0)).unwrap();
    sched.insert(a, 5_000, 1_000).unwrap();
    sched.insert(b, 5_000, 1_000).unwrap();

    sched.cancel(a).unwrap();
    sched.complete(a).unwrap();
    sched.complete(a).unwrap();

    assert_eq!(sched.queued(), vec![b]);
    assert_eq!(sched.task(a).unwrap().state, TaskState::Completed);
}

#[test]
fn reinsert_retimes_in_place() {
    let (soft, sched) = boot();
    let a = sched.task_init(done, TaskConfig::new(0)).unwrap();
    let b = sched.task_init(done, TaskConfig::new(0)).unwrap();
    sched.insert(a, 5_000, 1_000).unwrap();
    sched.insert(b, 5_000, 1_000).unwrap();

    soft.clock.set(10);
    sched.insert(a, 0, 1_000).unwrap();
    assert_eq!(sched.queued(), vec![a, b]);
    assert_eq!(sched.task(a).unwrap().timing.start, 10);
}

#[test]
fn self_rescheduling_task_is_periodic() {
    let (soft, sched) = boot();
    let runs = Arc::new(AtomicU32::new(0));
    let counter = runs.clone();
    let t = sched
        .task_init(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                WorkStatus::Reschedule {
                    start_us: 1_000,
                    deadline_us: 1_000,
                }
            },
            TaskConfig::new(0),
        )
        .unwrap();

    sched.insert(t, 0, 1_000).unwrap();
    soft.step();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // next start = previous start + 1 ms - scheduling cost
    let start = sched.task(t).unwrap().timing.start;
    assert_eq!(start, 19_200 - 200);
    assert_eq!(soft.timer.armed_at(), Some(start));

    soft.advance(start);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(sched.task(t).unwrap().timing.start, 2 * start);
}

#[test]
fn stale_handles_are_rejected() {
    let (_soft, sched) = boot();
    let old = sched.task_init(done, TaskConfig::new(0)).unwrap();
    sched.task_free(old).unwrap();
    let new = sched.task_init(done, TaskConfig::new(0)).unwrap();

    assert_eq!(new.index(), old.index());
    assert_eq!(sched.insert(old, 0, 1_000), Err(SchedError::UnknownTask { task: old }));
    assert_eq!(sched.task_free(old), Err(SchedError::UnknownTask { task: old }));
    assert!(sched.task(old).is_none());
    assert_eq!(sched.task(new).unwrap().state, TaskState::Init);
}

#[test]
fn task_config_updates_budget() {
    let (_soft, sched) = boot();
    let t = sched.task_init(done, TaskConfig::new(0)).unwrap();
    sched
        .task_config(t, TaskConfig::new(500).with_priority(3).with_core(1))
        .unwrap();

    let snap = sched.task(t).unwrap();
    assert_eq!(snap.timing.max_runtime, 500);
    assert_eq!((snap.priority, snap.core), (3, 1));
}

#[test]
fn runtime_budget_brings_selection_forward() {
    let (_soft, sched) = boot();
    let light = sched.task_init(done, TaskConfig::new(0)).unwrap();
    // needs 15_000 of its 19_200 ticks
    let heavy = sched.task_init(done, TaskConfig::new(15_000)).unwrap();
    sched.insert(light, 0, 500).unwrap();
    sched.insert(heavy, 0, 1_000).unwrap();

    assert_eq!(sched.run_pass().dispatched, Some(heavy));
    assert_eq!(sched.run_pass().dispatched, Some(light));
}
