//! The kernel context: one value that owns every simulated process.
//!
//! [`Kernel`] ties the scheduler, mailbox and semaphore bank together and
//! exposes one method per external command. The methods are spread over
//! three files:
//!
//! * this file: registry lookups, process lifecycle, termination, inspection;
//! * [`ipc`]: send / receive / reply;
//! * [`sync`]: semaphore create / P / V.
//!
//! Every mutating operation validates its arguments first and only then
//! touches state, so an `Err` leaves the kernel unchanged. On success it
//! returns the [`KernelEvent`]s it produced, in order.

mod ipc;
mod sync;

use crate::config::{ConfigError, KernelConfig};
use crate::error::{KernelError, KernelResult};
use crate::event::KernelEvent;
use crate::mailbox::Mailbox;
use crate::process::{Pcb, ProcessId, ProcessState};
use crate::queue::FifoQueue;
use crate::scheduler::{RunSlot, Scheduler};
use crate::semaphore::SemaphoreBank;
use crate::snapshot::{ProcessInfo, SemaphoreInfo, SystemSnapshot};
use tracing::{debug, info, trace};

// ---------------------------------------------------------------------------
// Kernel
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Kernel {
    config: KernelConfig,
    scheduler: Scheduler,
    mailbox: Mailbox,
    semaphores: SemaphoreBank,
    /// Id handed to the next created or forked process.
    next_pid: ProcessId,
    halted: bool,
    /// Events produced by the operation in progress.
    events: Vec<KernelEvent>,
}

impl Default for Kernel {
    fn default() -> Self {
        let mut kernel = Self::assemble(KernelConfig::default());
        kernel.dispatch();
        kernel.events.clear();
        kernel
    }
}

impl Kernel {
    /// Validate `config`, build the containers and run the first dispatch.
    ///
    /// Returns the kernel together with the boot events (INIT being
    /// dispatched).
    pub fn boot(config: KernelConfig) -> Result<(Self, Vec<KernelEvent>), ConfigError> {
        config.validate()?;
        info!(
            levels = config.priority_levels,
            semaphores = config.semaphore_count,
            "booting kernel"
        );
        let mut kernel = Self::assemble(config);
        kernel.dispatch();
        let events = kernel.finish();
        Ok((kernel, events))
    }

    /// Like [`Kernel::boot`], discarding the boot events.
    pub fn new(config: KernelConfig) -> Result<Self, ConfigError> {
        Self::boot(config).map(|(kernel, _)| kernel)
    }

    fn assemble(config: KernelConfig) -> Self {
        Self {
            scheduler: Scheduler::new(config.priority_levels, config.aging_threshold),
            mailbox: Mailbox::new(),
            semaphores: SemaphoreBank::new(config.semaphore_count),
            next_pid: ProcessId::new(1),
            halted: false,
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn semaphores(&self) -> &SemaphoreBank {
        &self.semaphores
    }

    /// True once INIT has terminated.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Id of the process holding the CPU; `None` after shutdown.
    pub fn running_id(&self) -> Option<ProcessId> {
        self.scheduler.running_id()
    }

    // -- plumbing ---------------------------------------------------------

    /// The process issuing the current command.
    fn caller(&self) -> KernelResult<ProcessId> {
        if self.halted {
            return Err(KernelError::SystemHalted);
        }
        self.scheduler.running_id().ok_or(KernelError::SystemHalted)
    }

    fn ensure_alive(&self) -> KernelResult<()> {
        self.caller().map(|_| ())
    }

    fn emit(&mut self, event: KernelEvent) {
        self.events.push(event);
    }

    fn dispatch(&mut self) {
        self.scheduler.dispatch(&mut self.events);
    }

    /// Hand the buffered events to the caller.
    fn finish(&mut self) -> Vec<KernelEvent> {
        std::mem::take(&mut self.events)
    }

    /// Take the running PCB off the CPU and record why.
    ///
    /// Returns `None` when INIT is running; INIT never blocks.
    fn take_runner_for_block(&mut self, state: ProcessState) -> Option<Pcb> {
        let pcb = self.scheduler.take_running()?;
        debug!(pid = %pcb.id, %state, "blocked");
        self.events.push(KernelEvent::Blocked { pid: pcb.id, state });
        Some(pcb)
    }

    fn info_of(&self, pcb: &Pcb) -> ProcessInfo {
        ProcessInfo::from_pcb(pcb, self.config.aging_threshold)
    }

    // -- registry ---------------------------------------------------------

    /// Build a fresh PCB at `priority`. Consumes an id only on success.
    fn create_pcb(&mut self, priority: i64) -> KernelResult<Pcb> {
        let levels = self.config.priority_levels;
        let level = usize::try_from(priority)
            .ok()
            .filter(|&p| p < levels)
            .ok_or(KernelError::InvalidPriority {
                requested: priority,
                lowest: self.config.lowest_priority(),
            })?;
        let id = self.next_pid;
        self.next_pid = id.successor();
        Ok(Pcb::new(id, level, levels))
    }

    /// Locate a non-INIT process in any container.
    ///
    /// Search order: running slot, ready levels from 0, send-blocked,
    /// receive-blocked, then each semaphore's wait queue.
    pub fn find_anywhere(&self, pid: ProcessId) -> Option<&Pcb> {
        trace!(pid = %pid, "scanning containers");
        if let Some(pcb) = self.scheduler.running_pcb().filter(|p| p.id == pid) {
            return Some(pcb);
        }
        self.scheduler
            .find_ready(pid)
            .or_else(|| self.mailbox.send_blocked.find(|p| p.id == pid))
            .or_else(|| self.mailbox.receive_blocked.find(|p| p.id == pid))
            .or_else(|| self.semaphores.find_waiter(pid))
    }

    /// Detach a queued process from whichever container holds it.
    ///
    /// The running process is never removed here.
    fn remove_anywhere(&mut self, pid: ProcessId) -> Option<Pcb> {
        trace!(pid = %pid, "removing from containers");
        self.scheduler
            .remove_ready(pid)
            .or_else(|| self.mailbox.release_sender(pid))
            .or_else(|| self.mailbox.release_receiver(pid))
            .or_else(|| self.semaphores.remove_waiter(pid))
    }

    /// INIT always exists; anything else must be found in a container.
    pub fn exists(&self, pid: ProcessId) -> bool {
        pid.is_init() || self.find_anywhere(pid).is_some()
    }

    /// INIT plus every live process; 0 once the kernel has shut down.
    pub fn count_all(&self) -> usize {
        if self.halted {
            return 0;
        }
        1 + usize::from(self.scheduler.running_pcb().is_some())
            + self.scheduler.ready_count()
            + self.mailbox.send_blocked.len()
            + self.mailbox.receive_blocked.len()
            + self.semaphores.blocked_count()
    }

    // -- lifecycle --------------------------------------------------------

    /// Create a process at `priority` and make it ready.
    ///
    /// When INIT is the caller it is switched out immediately so the new
    /// process gets the CPU.
    pub fn create_process(&mut self, priority: i64) -> KernelResult<Vec<KernelEvent>> {
        let caller = self.caller()?;
        let pcb = self.create_pcb(priority)?;
        info!(pid = %pcb.id, priority = pcb.priority, "process created");
        let created = self.info_of(&pcb);
        self.scheduler.admit(pcb);
        self.emit(KernelEvent::ProcessCreated { process: created });
        if caller.is_init() {
            self.dispatch();
        }
        Ok(self.finish())
    }

    /// Duplicate the running process at its current priority.
    pub fn fork(&mut self) -> KernelResult<Vec<KernelEvent>> {
        let caller = self.caller()?;
        let priority = match self.scheduler.running_pcb() {
            Some(pcb) => pcb.priority,
            None => return Err(KernelError::CannotForkInit),
        };
        let child = self.create_pcb(priority as i64)?;
        info!(parent = %caller, child = %child.id, "process forked");
        let forked = self.info_of(&child);
        self.scheduler.admit(child);
        self.emit(KernelEvent::ProcessForked {
            parent: caller,
            child: forked,
        });
        Ok(self.finish())
    }

    /// Terminate `pid` on behalf of the running process.
    pub fn kill(&mut self, pid: ProcessId) -> KernelResult<Vec<KernelEvent>> {
        self.terminate(pid, false)
    }

    /// Terminate the running process.
    pub fn exit(&mut self) -> KernelResult<Vec<KernelEvent>> {
        let caller = self.caller()?;
        self.terminate(caller, true)
    }

    /// Force a reschedule, as if the runner's time slice ran out.
    pub fn quantum_expired(&mut self) -> KernelResult<Vec<KernelEvent>> {
        self.ensure_alive()?;
        self.dispatch();
        Ok(self.finish())
    }

    fn terminate(&mut self, pid: ProcessId, voluntary: bool) -> KernelResult<Vec<KernelEvent>> {
        let caller = self.caller()?;

        if pid.is_init() {
            let total = self.count_all();
            if total > 1 {
                return Err(KernelError::InitProtection {
                    remaining: total - 1,
                });
            }
            let prior_state = self.scheduler.idle.state;
            self.scheduler.halt();
            self.halted = true;
            info!("INIT terminated, shutting down");
            self.emit(KernelEvent::Terminated {
                pid,
                prior_state,
                voluntary,
            });
            self.emit(KernelEvent::Shutdown);
            return Ok(self.finish());
        }

        if pid == caller {
            if let Some(pcb) = self.scheduler.take_running() {
                info!(pid = %pcb.id, voluntary, "running process terminated");
                self.emit(KernelEvent::Terminated {
                    pid,
                    prior_state: ProcessState::Running,
                    voluntary,
                });
                self.dispatch();
                return Ok(self.finish());
            }
        }

        let pcb = self
            .remove_anywhere(pid)
            .ok_or(KernelError::ProcessNotFound(pid))?;
        info!(pid = %pcb.id, state = %pcb.state, "process terminated");
        self.emit(KernelEvent::Terminated {
            pid,
            prior_state: pcb.state,
            voluntary,
        });
        Ok(self.finish())
    }

    // -- inspection -------------------------------------------------------

    /// Describe one process, INIT included.
    pub fn process_info(&self, pid: ProcessId) -> KernelResult<ProcessInfo> {
        self.ensure_alive()?;
        if pid.is_init() {
            return Ok(ProcessInfo::from_idle(
                self.scheduler.idle(),
                self.config.priority_levels,
            ));
        }
        self.find_anywhere(pid)
            .map(|pcb| self.info_of(pcb))
            .ok_or(KernelError::ProcessNotFound(pid))
    }

    /// Describe every container.
    pub fn snapshot(&self) -> SystemSnapshot {
        let infos = |q: &FifoQueue<Pcb>| -> Vec<ProcessInfo> {
            q.iter().map(|p| self.info_of(p)).collect()
        };
        SystemSnapshot {
            process_count: self.count_all(),
            running: self.scheduler.running_info(),
            ready: self.scheduler.ready_queues().iter().map(&infos).collect(),
            send_blocked: infos(&self.mailbox.send_blocked),
            receive_blocked: infos(&self.mailbox.receive_blocked),
            messages: self.mailbox.messages.iter().cloned().collect(),
            semaphores: self
                .semaphores
                .iter()
                .map(|s| SemaphoreInfo::from_semaphore(s, self.config.aging_threshold))
                .collect(),
        }
    }

    /// Whether INIT is the process on the CPU.
    pub fn init_is_running(&self) -> bool {
        matches!(self.scheduler.running, RunSlot::Idle)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> ProcessId {
        ProcessId::new(n)
    }

    #[test]
    fn boot_dispatches_init() {
        let (kernel, events) = Kernel::boot(KernelConfig::default()).unwrap();
        assert!(kernel.init_is_running());
        assert_eq!(kernel.count_all(), 1);
        assert!(matches!(
            events.as_slice(),
            [KernelEvent::Dispatched { process }] if process.is_init
        ));
    }

    #[test]
    fn boot_rejects_bad_config() {
        let cfg = KernelConfig {
            semaphore_count: 0,
            ..KernelConfig::default()
        };
        assert!(Kernel::boot(cfg).is_err());
    }

    #[test]
    fn ids_are_sequential_and_not_consumed_by_failures() {
        let mut k = Kernel::default();
        k.create_process(1).unwrap();
        assert!(k.create_process(7).is_err());
        assert!(k.create_process(-1).is_err());
        k.create_process(1).unwrap();
        assert!(k.exists(pid(1)));
        assert!(k.exists(pid(2)));
        assert!(!k.exists(pid(3)));
    }

    #[test]
    fn invalid_priority_reports_lowest_level() {
        let mut k = Kernel::default();
        assert_eq!(
            k.create_process(3),
            Err(KernelError::InvalidPriority {
                requested: 3,
                lowest: 2
            })
        );
    }

    #[test]
    fn create_from_init_switches_to_new_process() {
        let mut k = Kernel::default();
        let events = k.create_process(0).unwrap();
        assert_eq!(k.running_id(), Some(pid(1)));
        assert!(matches!(events[0], KernelEvent::ProcessCreated { .. }));
        assert!(matches!(
            &events[1],
            KernelEvent::Dispatched { process } if process.id == pid(1)
        ));
        assert_eq!(k.scheduler().idle().state(), ProcessState::Ready);
    }

    #[test]
    fn create_from_process_does_not_dispatch() {
        let mut k = Kernel::default();
        k.create_process(1).unwrap();
        let events = k.create_process(0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(k.running_id(), Some(pid(1)));
    }

    #[test]
    fn fork_copies_priority_without_dispatch() {
        let mut k = Kernel::default();
        assert_eq!(k.fork(), Err(KernelError::CannotForkInit));
        k.create_process(2).unwrap();
        let events = k.fork().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            KernelEvent::ProcessForked { parent, child } => {
                assert_eq!(*parent, pid(1));
                assert_eq!(child.id, pid(2));
                assert_eq!(child.priority, 2);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(k.running_id(), Some(pid(1)));
    }

    #[test]
    fn count_all_includes_every_container() {
        let mut k = Kernel::default();
        k.create_process(0).unwrap();
        k.create_process(1).unwrap();
        k.create_process(2).unwrap();
        assert_eq!(k.count_all(), 4);
        k.receive().unwrap();
        assert_eq!(k.count_all(), 4);
    }

    #[test]
    fn kill_queued_process_reports_prior_state() {
        let mut k = Kernel::default();
        k.create_process(0).unwrap();
        k.create_process(1).unwrap();
        let events = k.kill(pid(2)).unwrap();
        assert_eq!(
            events,
            vec![KernelEvent::Terminated {
                pid: pid(2),
                prior_state: ProcessState::Ready,
                voluntary: false,
            }]
        );
        assert_eq!(k.kill(pid(2)), Err(KernelError::ProcessNotFound(pid(2))));
    }

    #[test]
    fn exit_running_dispatches_next() {
        let mut k = Kernel::default();
        k.create_process(0).unwrap();
        let events = k.exit().unwrap();
        assert!(matches!(
            events[0],
            KernelEvent::Terminated {
                prior_state: ProcessState::Running,
                voluntary: true,
                ..
            }
        ));
        assert!(k.init_is_running());
    }

    #[test]
    fn init_termination_halts_kernel() {
        let mut k = Kernel::default();
        let events = k.exit().unwrap();
        assert_eq!(events.last(), Some(&KernelEvent::Shutdown));
        assert!(k.is_halted());
        assert_eq!(k.running_id(), None);
        assert_eq!(k.create_process(0), Err(KernelError::SystemHalted));
        assert_eq!(k.quantum_expired(), Err(KernelError::SystemHalted));
        assert!(k.snapshot().running.is_none());
    }

    #[test]
    fn process_info_for_init_and_missing() {
        let k = Kernel::default();
        let info = k.process_info(ProcessId::INIT).unwrap();
        assert!(info.is_init);
        assert_eq!(info.priority, 3);
        assert_eq!(
            k.process_info(pid(9)),
            Err(KernelError::ProcessNotFound(pid(9)))
        );
    }
}
