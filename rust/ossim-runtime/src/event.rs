//! Observable effects of kernel operations.
//!
//! Operations never print. Instead they return the ordered list of
//! [`KernelEvent`]s they produced, and the caller decides how to show them.

use crate::mailbox::Message;
use crate::process::{PriorityDirection, ProcessId, ProcessState};
use crate::snapshot::ProcessInfo;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KernelEvent {
    /// A new process was admitted to a ready queue.
    ProcessCreated { process: ProcessInfo },
    /// The running process was duplicated.
    ProcessForked {
        parent: ProcessId,
        child: ProcessInfo,
    },
    /// A process took the CPU.
    Dispatched { process: ProcessInfo },
    /// A message held for the new runner was handed over at dispatch.
    MessageDelivered { message: Message },
    /// Aging moved a process to another level.
    PriorityChanged {
        pid: ProcessId,
        from: usize,
        to: usize,
        direction: PriorityDirection,
    },
    /// The running process left the CPU to wait.
    Blocked { pid: ProcessId, state: ProcessState },
    /// A blocked process became ready; `from` is the state it left.
    Unblocked { pid: ProcessId, from: ProcessState },
    MessageSent { message: Message },
    ReplySent { message: Message },
    /// The caller found a message waiting in the mailbox.
    MessageReceived { message: Message },
    /// The caller found nothing waiting in the mailbox.
    NoMessage { pid: ProcessId },
    Terminated {
        pid: ProcessId,
        prior_state: ProcessState,
        voluntary: bool,
    },
    SemaphoreCreated { id: usize, value: i64 },
    /// P operation; `from` and `to` are the values around the decrement.
    SemaphoreWaited { id: usize, from: i64, to: i64 },
    /// V operation; `from` and `to` are the values around the increment.
    SemaphoreSignalled { id: usize, from: i64, to: i64 },
    /// INIT terminated; the kernel is halted.
    Shutdown,
}

impl KernelEvent {
    /// The process this event is about, if it names exactly one.
    pub fn subject(&self) -> Option<ProcessId> {
        match self {
            KernelEvent::ProcessCreated { process } | KernelEvent::Dispatched { process } => {
                Some(process.id)
            }
            KernelEvent::ProcessForked { child, .. } => Some(child.id),
            KernelEvent::MessageDelivered { message }
            | KernelEvent::MessageReceived { message } => Some(message.recipient()),
            KernelEvent::MessageSent { message } | KernelEvent::ReplySent { message } => {
                Some(message.sender())
            }
            KernelEvent::PriorityChanged { pid, .. }
            | KernelEvent::Blocked { pid, .. }
            | KernelEvent::Unblocked { pid, .. }
            | KernelEvent::NoMessage { pid }
            | KernelEvent::Terminated { pid, .. } => Some(*pid),
            KernelEvent::SemaphoreCreated { .. }
            | KernelEvent::SemaphoreWaited { .. }
            | KernelEvent::SemaphoreSignalled { .. }
            | KernelEvent::Shutdown => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
