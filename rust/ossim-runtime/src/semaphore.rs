//! A fixed pool of counting semaphores with FIFO wait queues.
//!
//! Slots are pre-allocated when the kernel boots and start out
//! [`SemaphoreStatus::NotCreated`]. A slot can be created exactly once; there
//! is no destroy operation.
//!
//! As with the mailbox, the blocking policy lives on
//! [`Kernel`](crate::Kernel). The bank validates ids, tracks values and owns
//! the blocked PCBs.

use crate::error::{KernelError, KernelResult};
use crate::process::{Pcb, ProcessId, ProcessState};
use crate::queue::FifoQueue;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Semaphore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemaphoreStatus {
    Created,
    NotCreated,
}

/// One counting semaphore slot.
#[derive(Debug)]
pub struct Semaphore {
    id: usize,
    status: SemaphoreStatus,
    value: i64,
    pub(crate) waiters: FifoQueue<Pcb>,
}

impl Semaphore {
    fn vacant(id: usize) -> Self {
        Self {
            id,
            status: SemaphoreStatus::NotCreated,
            value: 0,
            waiters: FifoQueue::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn status(&self) -> SemaphoreStatus {
        self.status
    }

    pub fn is_created(&self) -> bool {
        self.status == SemaphoreStatus::Created
    }

    /// Current value. Negative values count processes that had to wait.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Blocked processes, longest waiter first.
    pub fn waiters(&self) -> &FifoQueue<Pcb> {
        &self.waiters
    }

    /// Decrement; returns `(old, new)`.
    pub(crate) fn decrement(&mut self) -> (i64, i64) {
        self.value -= 1;
        (self.value + 1, self.value)
    }

    /// Increment; returns `(old, new)`.
    pub(crate) fn increment(&mut self) -> (i64, i64) {
        self.value += 1;
        (self.value - 1, self.value)
    }

    pub(crate) fn enqueue(&mut self, mut pcb: Pcb) {
        pcb.state = ProcessState::SemBlocked;
        self.waiters.push(pcb);
    }

    /// Release the longest waiter if the value says one is owed a wakeup.
    pub(crate) fn release_waiter(&mut self) -> Option<Pcb> {
        if self.value <= 0 {
            self.waiters.pop()
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// SemaphoreBank
// ---------------------------------------------------------------------------

/// The fixed set of semaphore slots.
#[derive(Debug)]
pub struct SemaphoreBank {
    slots: Vec<Semaphore>,
}

impl SemaphoreBank {
    /// Pre-allocate `count` vacant slots with ids `0..count`.
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(Semaphore::vacant).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Semaphore> {
        self.slots.iter()
    }

    /// Map a raw id onto a slot index.
    fn index(&self, id: i64) -> KernelResult<usize> {
        usize::try_from(id)
            .ok()
            .filter(|&idx| idx < self.slots.len())
            .ok_or(KernelError::InvalidSemaphoreId {
                id,
                max: self.slots.len() as i64 - 1,
            })
    }

    /// Look up any slot, created or not.
    pub fn get(&self, id: i64) -> KernelResult<&Semaphore> {
        let idx = self.index(id)?;
        Ok(&self.slots[idx])
    }

    /// Look up a slot that has been created.
    pub(crate) fn created_mut(&mut self, id: i64) -> KernelResult<&mut Semaphore> {
        let idx = self.index(id)?;
        let sem = &mut self.slots[idx];
        if !sem.is_created() {
            return Err(KernelError::SemaphoreNotCreated(idx));
        }
        Ok(sem)
    }

    /// Create slot `id` with `value`.
    ///
    /// Checks, in order: id in range, value non-negative, not yet created.
    pub(crate) fn create(&mut self, id: i64, value: i64) -> KernelResult<usize> {
        let idx = self.index(id)?;
        if value < 0 {
            return Err(KernelError::InvalidSemaphoreValue(value));
        }
        let sem = &mut self.slots[idx];
        if sem.is_created() {
            return Err(KernelError::SemaphoreAlreadyCreated(idx));
        }
        sem.status = SemaphoreStatus::Created;
        sem.value = value;
        sem.waiters = FifoQueue::new();
        Ok(idx)
    }

    /// Total PCBs blocked across every slot.
    pub fn blocked_count(&self) -> usize {
        self.slots.iter().map(|s| s.waiters.len()).sum()
    }

    pub(crate) fn find_waiter(&self, pid: ProcessId) -> Option<&Pcb> {
        self.slots
            .iter()
            .find_map(|s| s.waiters.find(|p| p.id == pid))
    }

    /// Detach `pid` from whichever wait queue holds it. The semaphore
    /// value is left as it is.
    pub(crate) fn remove_waiter(&mut self, pid: ProcessId) -> Option<Pcb> {
        self.slots
            .iter_mut()
            .find_map(|s| s.waiters.remove_first(|p| p.id == pid))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
