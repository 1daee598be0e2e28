//! Task table
//!
//! Fixed-capacity slab of task records plus the EDF queue (task handles in
//! admission order). Storage is reserved up front so nothing allocates
//! while the scheduler lock is held.

use super::task::{TaskId, TaskRecord};
use alloc::vec::Vec;

/// Slab slot
struct Slot {
    generation: u32,
    record: Option<TaskRecord>,
}

pub(crate) struct TaskTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    queue: Vec<TaskId>,
    capacity: usize,
}

impl TaskTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            queue: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live task records
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Store a record; hands it back when the table is full so the caller
    /// can drop it outside the lock
    pub fn alloc(&mut self, record: TaskRecord) -> Result<TaskId, TaskRecord> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            return Ok(TaskId::new(index, slot.generation));
        }

        if self.slots.len() >= self.capacity {
            return Err(record);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            record: Some(record),
        });
        Ok(TaskId::new(index, 0))
    }

    /// Drop a record; its handle goes stale
    pub fn release(&mut self, id: TaskId) -> Option<TaskRecord> {
        self.dequeue(id);
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        Some(record)
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskRecord> {
        self.slots
            .get(id.index() as usize)
            .filter(|s| s.generation == id.generation())
            .and_then(|s| s.record.as_ref())
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskRecord> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|s| s.generation == id.generation())
            .and_then(|s| s.record.as_mut())
    }

    /// Admission-ordered queue
    pub fn queue(&self) -> &[TaskId] {
        &self.queue
    }

    pub fn is_queued(&self, id: TaskId) -> bool {
        self.queue.contains(&id)
    }

    /// Append unless already a member
    pub fn enqueue(&mut self, id: TaskId) {
        if !self.is_queued(id) {
            self.queue.push(id);
        }
    }

    /// Remove from the queue, keeping the order of the others
    pub fn dequeue(&mut self, id: TaskId) -> bool {
        match self.queue.iter().position(|&q| q == id) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove the queue entry at `pos`
    pub fn dequeue_at(&mut self, pos: usize) -> TaskId {
        self.queue.remove(pos)
    }
}
