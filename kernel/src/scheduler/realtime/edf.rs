//! Earliest Deadline First selection
//!
//! Scans the queue in admission order and returns the queued task whose
//! effective deadline (`deadline − max_runtime`) is nearest. Running tasks
//! are skipped.
//!
//! Late tasks are handled during the same scan: the first one found is
//! cancelled, every later one is realigned and left in the queue (it is not
//! a candidate for this pass).

use super::deadline::{realign, Realignment};
use crate::scheduler::table::TaskTable;
use crate::scheduler::task::{CancelReason, TaskId, TaskState};
use crate::time::Ticks;

/// Outcome of one selection scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Selection {
    /// Task with the earliest effective deadline
    pub next: Option<TaskId>,
    /// Task cancelled for missing its slot
    pub cancelled: Option<TaskId>,
    /// Late tasks given a new window
    pub repaired: u32,
    /// Repairs that could not keep the task's phase
    pub exhausted: u32,
}

/// Pick the next task at `current`. Caller holds the scheduler lock.
pub(crate) fn select(table: &mut TaskTable, current: Ticks) -> Selection {
    let mut sel = Selection::default();
    let mut next_delta = Ticks::MAX;
    let mut missed = 0u32;
    let mut pos = 0;

    while pos < table.queue().len() {
        let id = table.queue()[pos];
        let Some(task) = table.get_mut(id) else {
            pos += 1;
            continue;
        };

        if task.state != TaskState::Queued {
            pos += 1;
            continue;
        }

        let deadline = task.timing.effective_deadline();
        if !task.timing.is_missed(current) {
            let delta = deadline - current;
            if delta < next_delta {
                next_delta = delta;
                sel.next = Some(id);
            }
            pos += 1;
            continue;
        }

        missed += 1;
        if missed == 1 {
            log::warn!(
                "edf: {} missed its slot (deadline {} <= now {}), cancelled",
                id,
                deadline,
                current
            );
            task.cancel(CancelReason::DeadlineMissed);
            table.dequeue_at(pos);
            sel.cancelled = Some(id);
        } else {
            let result = realign(&mut task.timing, current);
            sel.repaired += 1;
            if result == Realignment::Exhausted {
                sel.exhausted += 1;
                log::warn!(
                    "edf: {} slipped too far, restarted at {}",
                    id,
                    task.timing.start
                );
            } else {
                log::debug!(
                    "edf: {} realigned to {}..{}",
                    id,
                    task.timing.start,
                    task.timing.deadline
                );
            }
            pos += 1;
        }
    }

    sel
}
