//! Process Control Block (PCB) for the simulated kernel.
//!
//! Each simulated process is represented by a [`Pcb`]. It tracks identity,
//! scheduling state, the multilevel-feedback bookkeeping (priority level,
//! aging direction, bursts at the current level), and a single slot for a
//! message that has been delivered but not yet observed by the process.
//!
//! A `Pcb` is owned by value by exactly one container at a time (a ready
//! queue, a blocked queue, a semaphore wait queue, or the running slot).
//! Moving it between containers is a plain Rust move.

use crate::mailbox::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ProcessId
// ---------------------------------------------------------------------------

/// A unique identifier for a simulated process.
///
/// Ids are handed out sequentially by the owning [`Kernel`](crate::Kernel)
/// starting at 1 and are never reused. Id 0 is reserved for INIT.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(u32);

impl ProcessId {
    /// The reserved id of the idle (INIT) process.
    pub const INIT: ProcessId = ProcessId(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Return the raw numeric value.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn is_init(self) -> bool {
        self == Self::INIT
    }

    /// The id that follows this one.
    pub(crate) fn successor(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u32> for ProcessId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessId({})", self.0)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ProcessState
// ---------------------------------------------------------------------------

/// The lifecycle state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    /// Waiting for a reply to a message it sent.
    SendBlocked,
    /// Waiting for a message to arrive.
    ReceiveBlocked,
    /// Waiting on a semaphore.
    SemBlocked,
    /// Eligible to be dispatched.
    Ready,
    /// Holding the CPU.
    Running,
}

impl ProcessState {
    /// Whether the process is parked in one of the blocked collections.
    pub fn is_blocked(self) -> bool {
        matches!(
            self,
            ProcessState::SendBlocked | ProcessState::ReceiveBlocked | ProcessState::SemBlocked
        )
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::SendBlocked => write!(f, "SEND-BLOCKED"),
            ProcessState::ReceiveBlocked => write!(f, "RECEIVE-BLOCKED"),
            ProcessState::SemBlocked => write!(f, "SEMAPHORE-BLOCKED"),
            ProcessState::Ready => write!(f, "READY"),
            ProcessState::Running => write!(f, "RUNNING"),
        }
    }
}

// ---------------------------------------------------------------------------
// PriorityDirection
// ---------------------------------------------------------------------------

/// Which way aging moves a process once it has used up its bursts at a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityDirection {
    /// Towards level 0 (higher priority).
    Promoting,
    /// Towards the lowest level.
    Demoting,
}

impl PriorityDirection {
    /// The noun for the next level change ("PROMOTION" / "DEMOTION").
    pub fn goal(self) -> &'static str {
        match self {
            PriorityDirection::Promoting => "PROMOTION",
            PriorityDirection::Demoting => "DEMOTION",
        }
    }
}

impl fmt::Display for PriorityDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityDirection::Promoting => write!(f, "PROMOTING"),
            PriorityDirection::Demoting => write!(f, "DEMOTING"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pcb
// ---------------------------------------------------------------------------

/// The Process Control Block for a single non-INIT process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcb {
    pub(crate) id: ProcessId,
    /// 0 = highest, `levels - 1` = lowest.
    pub(crate) priority: usize,
    pub(crate) direction: PriorityDirection,
    /// Completed bursts since the last priority change.
    pub(crate) bursts: u32,
    pub(crate) state: ProcessState,
    /// Delivered but not yet observed; drained at dispatch.
    pub(crate) pending: Option<Message>,
}

impl Pcb {
    /// Create a PCB at `priority` in a scheduler with `levels` ready queues.
    ///
    /// A process born at the lowest level starts out promoting; every other
    /// process starts out demoting. The caller validates `priority`.
    pub(crate) fn new(id: ProcessId, priority: usize, levels: usize) -> Self {
        let direction = if priority + 1 == levels {
            PriorityDirection::Promoting
        } else {
            PriorityDirection::Demoting
        };
        Self {
            id,
            priority,
            direction,
            bursts: 0,
            state: ProcessState::Ready,
            pending: None,
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn priority(&self) -> usize {
        self.priority
    }

    pub fn direction(&self) -> PriorityDirection {
        self.direction
    }

    pub fn bursts(&self) -> u32 {
        self.bursts
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// The delivered-but-unobserved message, if any.
    pub fn pending_message(&self) -> Option<&Message> {
        self.pending.as_ref()
    }

    /// Store a delivered message, replacing any earlier one.
    pub(crate) fn attach_message(&mut self, message: Message) {
        self.pending = Some(message);
    }

    pub(crate) fn take_message(&mut self) -> Option<Message> {
        self.pending.take()
    }
}

// ---------------------------------------------------------------------------
// IdleProcess
// ---------------------------------------------------------------------------

/// Bookkeeping for INIT (id 0).
///
/// INIT is never queued and never aged, so it does not get a [`Pcb`]. It only
/// alternates between RUNNING and READY and counts how often it was switched
/// out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleProcess {
    pub(crate) state: ProcessState,
    pub(crate) bursts: u32,
    pub(crate) pending: Option<Message>,
}

impl IdleProcess {
    pub(crate) fn new() -> Self {
        Self {
            state: ProcessState::Running,
            bursts: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Total number of times INIT has been switched out.
    pub fn bursts(&self) -> u32 {
        self.bursts
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
