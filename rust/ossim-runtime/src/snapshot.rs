//! Read-only views of kernel state.
//!
//! [`ProcessInfo`] describes one process; [`SystemSnapshot`] describes every
//! container at once. Both are plain data detached from the kernel and
//! serialize with serde so the command surface can emit them as JSON.

use crate::mailbox::Message;
use crate::process::{IdleProcess, Pcb, PriorityDirection, ProcessId, ProcessState};
use crate::semaphore::{Semaphore, SemaphoreStatus};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ProcessInfo
// ---------------------------------------------------------------------------

/// A point-in-time description of a single process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub id: ProcessId,
    pub state: ProcessState,
    /// INIT reports the sentinel level `L`.
    pub priority: usize,
    /// `None` for INIT, which is never aged.
    pub direction: Option<PriorityDirection>,
    /// Bursts at the current level; total bursts for INIT.
    pub bursts: u32,
    /// Bursts left before the next level change; `None` for INIT.
    pub bursts_remaining: Option<u32>,
    pub is_init: bool,
}

impl ProcessInfo {
    pub(crate) fn from_pcb(pcb: &Pcb, aging_threshold: u32) -> Self {
        Self {
            id: pcb.id,
            state: pcb.state,
            priority: pcb.priority,
            direction: Some(pcb.direction),
            bursts: pcb.bursts,
            bursts_remaining: Some(aging_threshold.saturating_sub(pcb.bursts)),
            is_init: false,
        }
    }

    pub(crate) fn from_idle(idle: &IdleProcess, levels: usize) -> Self {
        Self {
            id: ProcessId::INIT,
            state: idle.state,
            priority: levels,
            direction: None,
            bursts: idle.bursts,
            bursts_remaining: None,
            is_init: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SemaphoreInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreInfo {
    pub id: usize,
    pub status: SemaphoreStatus,
    pub value: i64,
    /// Blocked processes, next to be released first.
    pub waiters: Vec<ProcessInfo>,
}

impl SemaphoreInfo {
    pub(crate) fn from_semaphore(sem: &Semaphore, aging_threshold: u32) -> Self {
        Self {
            id: sem.id(),
            status: sem.status(),
            value: sem.value(),
            waiters: sem
                .waiters()
                .iter()
                .map(|p| ProcessInfo::from_pcb(p, aging_threshold))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// SystemSnapshot
// ---------------------------------------------------------------------------

/// Every container of the kernel, each listed in service order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    /// INIT plus every live process.
    pub process_count: usize,
    /// `None` only after shutdown.
    pub running: Option<ProcessInfo>,
    /// One entry per priority level, level 0 first.
    pub ready: Vec<Vec<ProcessInfo>>,
    pub send_blocked: Vec<ProcessInfo>,
    pub receive_blocked: Vec<ProcessInfo>,
    /// Undelivered messages in arrival order.
    pub messages: Vec<Message>,
    pub semaphores: Vec<SemaphoreInfo>,
}

impl SystemSnapshot {
    /// Ids of every ready process across all levels, in dispatch order.
    pub fn ready_ids(&self) -> Vec<ProcessId> {
        self.ready.iter().flatten().map(|p| p.id).collect()
    }

    pub fn semaphore(&self, id: usize) -> Option<&SemaphoreInfo> {
        self.semaphores.iter().find(|s| s.id == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
