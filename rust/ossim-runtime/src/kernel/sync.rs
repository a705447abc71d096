//! Counting semaphores: create, P (wait) and V (signal).

use super::Kernel;
use crate::error::KernelResult;
use crate::event::KernelEvent;
use crate::process::ProcessState;
use tracing::{debug, info};

impl Kernel {
    /// Create semaphore `id` with initial `value`.
    pub fn new_semaphore(&mut self, id: i64, value: i64) -> KernelResult<Vec<KernelEvent>> {
        self.ensure_alive()?;
        let idx = self.semaphores.create(id, value)?;
        info!(id = idx, value, "semaphore created");
        self.emit(KernelEvent::SemaphoreCreated { id: idx, value });
        Ok(self.finish())
    }

    /// P: decrement, and block the caller if the value went negative.
    ///
    /// INIT decrements but never blocks.
    pub fn semaphore_wait(&mut self, id: i64) -> KernelResult<Vec<KernelEvent>> {
        let caller = self.caller()?;
        let sem = self.semaphores.created_mut(id)?;
        let (from, to) = sem.decrement();
        let idx = sem.id();
        self.emit(KernelEvent::SemaphoreWaited { id: idx, from, to });

        if to < 0 && !caller.is_init() {
            if let Some(pcb) = self.take_runner_for_block(ProcessState::SemBlocked) {
                self.semaphores.created_mut(id)?.enqueue(pcb);
                self.dispatch();
            }
        }
        Ok(self.finish())
    }

    /// V: increment, and release the longest waiter if one is owed.
    pub fn semaphore_signal(&mut self, id: i64) -> KernelResult<Vec<KernelEvent>> {
        let caller = self.caller()?;
        let sem = self.semaphores.created_mut(id)?;
        let (from, to) = sem.increment();
        let idx = sem.id();
        let released = sem.release_waiter();
        self.emit(KernelEvent::SemaphoreSignalled { id: idx, from, to });

        if let Some(pcb) = released {
            debug!(pid = %pcb.id, semaphore = idx, "sem-unblocked");
            self.emit(KernelEvent::Unblocked {
                pid: pcb.id,
                from: ProcessState::SemBlocked,
            });
            self.scheduler.admit(pcb);
        }

        if caller.is_init() {
            self.dispatch();
        }
        Ok(self.finish())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
