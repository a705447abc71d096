//! Multilevel-feedback scheduler for the simulated CPU.
//!
//! The scheduler owns one FIFO ready queue per priority level, the single
//! running slot, and the bookkeeping for INIT (the idle process).
//!
//! # Dispatch
//!
//! Every reschedule goes through [`Scheduler::dispatch`]:
//!
//! 1. The outgoing runner is retired. A regular process is aged and put back
//!    at the arrival end of its (possibly new) level. INIT is only marked
//!    READY and has its burst counter bumped. An empty slot (the runner
//!    blocked or was killed) retires nothing.
//! 2. The first non-empty level, scanning from 0 downward, yields the next
//!    runner. When every level is empty INIT runs.
//! 3. A message parked on the new runner is handed over and the slot cleared.
//!
//! # Aging
//!
//! A process that keeps getting re-queued accumulates bursts. After
//! `aging_threshold` bursts it moves one level in its current direction.
//! Reaching the lowest level forces PROMOTING, reaching level 0 forces
//! DEMOTING, so a long-lived process keeps sweeping between the extremes.

use crate::event::KernelEvent;
use crate::process::{IdleProcess, Pcb, PriorityDirection, ProcessId, ProcessState};
use crate::queue::FifoQueue;
use crate::snapshot::ProcessInfo;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// RunSlot
// ---------------------------------------------------------------------------

/// Whatever currently holds the CPU.
#[derive(Debug)]
pub(crate) enum RunSlot {
    /// INIT is running.
    Idle,
    Process(Pcb),
    /// Nobody. Only seen mid-dispatch and after shutdown.
    Empty,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Scheduler {
    ready: Vec<FifoQueue<Pcb>>,
    pub(crate) running: RunSlot,
    pub(crate) idle: IdleProcess,
    aging_threshold: u32,
}

impl Scheduler {
    /// Create a scheduler with `levels` ready queues and nobody running.
    pub(crate) fn new(levels: usize, aging_threshold: u32) -> Self {
        Self {
            ready: (0..levels).map(|_| FifoQueue::new()).collect(),
            running: RunSlot::Empty,
            idle: IdleProcess::new(),
            aging_threshold,
        }
    }

    /// Number of priority levels (L).
    pub fn levels(&self) -> usize {
        self.ready.len()
    }

    pub fn aging_threshold(&self) -> u32 {
        self.aging_threshold
    }

    /// Ready queues, level 0 first, each in next-to-run order.
    pub fn ready_queues(&self) -> &[FifoQueue<Pcb>] {
        &self.ready
    }

    /// Total processes across every ready level.
    pub fn ready_count(&self) -> usize {
        self.ready.iter().map(FifoQueue::len).sum()
    }

    // -- running slot -----------------------------------------------------

    /// Id of the current runner; `None` only after shutdown.
    pub fn running_id(&self) -> Option<ProcessId> {
        match &self.running {
            RunSlot::Idle => Some(ProcessId::INIT),
            RunSlot::Process(pcb) => Some(pcb.id),
            RunSlot::Empty => None,
        }
    }

    pub fn running_pcb(&self) -> Option<&Pcb> {
        match &self.running {
            RunSlot::Process(pcb) => Some(pcb),
            _ => None,
        }
    }

    pub(crate) fn running_pcb_mut(&mut self) -> Option<&mut Pcb> {
        match &mut self.running {
            RunSlot::Process(pcb) => Some(pcb),
            _ => None,
        }
    }

    pub fn idle(&self) -> &IdleProcess {
        &self.idle
    }

    /// Vacate the slot if a regular process holds it.
    ///
    /// INIT is left in place; it cannot block or be taken off the CPU.
    pub(crate) fn take_running(&mut self) -> Option<Pcb> {
        match std::mem::replace(&mut self.running, RunSlot::Empty) {
            RunSlot::Process(pcb) => Some(pcb),
            other => {
                self.running = other;
                None
            }
        }
    }

    /// Leave the CPU empty for good. Used when INIT terminates.
    pub(crate) fn halt(&mut self) {
        self.running = RunSlot::Empty;
    }

    /// Describe whoever is running.
    pub fn running_info(&self) -> Option<ProcessInfo> {
        match &self.running {
            RunSlot::Idle => Some(ProcessInfo::from_idle(&self.idle, self.levels())),
            RunSlot::Process(pcb) => Some(ProcessInfo::from_pcb(pcb, self.aging_threshold)),
            RunSlot::Empty => None,
        }
    }

    // -- ready queues -----------------------------------------------------

    /// Mark `pcb` READY and append it to its level.
    pub(crate) fn admit(&mut self, mut pcb: Pcb) {
        pcb.state = ProcessState::Ready;
        debug!(pid = %pcb.id, level = pcb.priority, "admitted to ready queue");
        self.ready[pcb.priority].push(pcb);
    }

    pub(crate) fn find_ready(&self, pid: ProcessId) -> Option<&Pcb> {
        self.ready.iter().find_map(|q| q.find(|p| p.id == pid))
    }

    pub(crate) fn remove_ready(&mut self, pid: ProcessId) -> Option<Pcb> {
        self.ready
            .iter_mut()
            .find_map(|q| q.remove_first(|p| p.id == pid))
    }

    /// Count one burst for `pcb` and move it a level once it has used
    /// `aging_threshold` of them.
    pub(crate) fn apply_aging(&self, pcb: &mut Pcb) -> Option<KernelEvent> {
        pcb.bursts += 1;
        if pcb.bursts < self.aging_threshold {
            return None;
        }
        pcb.bursts = 0;

        let lowest = self.levels() - 1;
        if lowest == 0 {
            trace!(pid = %pcb.id, "single level, aging has nowhere to go");
            return None;
        }
        if pcb.priority == lowest {
            pcb.direction = PriorityDirection::Promoting;
        } else if pcb.priority == 0 {
            pcb.direction = PriorityDirection::Demoting;
        }

        let from = pcb.priority;
        pcb.priority = match pcb.direction {
            PriorityDirection::Promoting => from - 1,
            PriorityDirection::Demoting => from + 1,
        };
        debug!(pid = %pcb.id, from, to = pcb.priority, "priority changed");
        Some(KernelEvent::PriorityChanged {
            pid: pcb.id,
            from,
            to: pcb.priority,
            direction: pcb.direction,
        })
    }

    /// Pop the next runner: highest non-empty level first, INIT otherwise.
    pub(crate) fn select_next(&mut self) -> RunSlot {
        for (level, queue) in self.ready.iter_mut().enumerate() {
            if let Some(pcb) = queue.pop() {
                trace!(pid = %pcb.id, level, "selected from ready queue");
                return RunSlot::Process(pcb);
            }
        }
        RunSlot::Idle
    }

    /// Retire the current runner, pick the next one, and report the switch.
    pub(crate) fn dispatch(&mut self, events: &mut Vec<KernelEvent>) {
        match std::mem::replace(&mut self.running, RunSlot::Empty) {
            RunSlot::Idle => {
                self.idle.state = ProcessState::Ready;
                self.idle.bursts += 1;
            }
            RunSlot::Process(mut pcb) => {
                if let Some(ev) = self.apply_aging(&mut pcb) {
                    events.push(ev);
                }
                self.admit(pcb);
            }
            RunSlot::Empty => {}
        }

        let delivered = match self.select_next() {
            RunSlot::Process(mut pcb) => {
                pcb.state = ProcessState::Running;
                let msg = pcb.take_message();
                self.running = RunSlot::Process(pcb);
                msg
            }
            _ => {
                self.idle.state = ProcessState::Running;
                self.running = RunSlot::Idle;
                self.idle.pending.take()
            }
        };

        if let Some(info) = self.running_info() {
            debug!(pid = %info.id, "dispatched");
            events.push(KernelEvent::Dispatched { process: info });
        }
        if let Some(message) = delivered {
            events.push(KernelEvent::MessageDelivered { message });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
