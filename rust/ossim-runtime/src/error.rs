//! Kernel error types.
//!
//! Every fallible kernel operation returns [`KernelResult`]. Errors are
//! raised before any state is touched, so a failed command leaves the
//! kernel exactly as it found it.

use crate::process::ProcessId;
use serde::Serialize;
use std::fmt;

/// Shorthand for results produced by kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

// ---------------------------------------------------------------------------
// KernelError
// ---------------------------------------------------------------------------

/// Failures reported by [`Kernel`](crate::Kernel) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// Requested priority is outside `0..levels`.
    #[error("priority level can only be between 0 (highest) and {lowest} (lowest), got {requested}")]
    InvalidPriority { requested: i64, lowest: usize },

    #[error("invalid semaphore id {id} (valid ids = 0-{max})")]
    InvalidSemaphoreId { id: i64, max: i64 },

    #[error("invalid semaphore value ({0} < 0)")]
    InvalidSemaphoreValue(i64),

    #[error("semaphore (ID = {0}) has already been created")]
    SemaphoreAlreadyCreated(usize),

    #[error("semaphore (ID = {0}) has not been created")]
    SemaphoreNotCreated(usize),

    /// Reply target is not waiting for a reply.
    #[error("no SEND-BLOCKED process with ID = {0}")]
    NotSendBlocked(ProcessId),

    #[error("cannot fork INIT process (ID = 0)")]
    CannotForkInit,

    /// INIT may only terminate once it is the last process.
    #[error(
        "cannot terminate INIT process (ID = 0), there are still {remaining} other processes in the system"
    )]
    InitProtection { remaining: usize },

    /// INIT has terminated; the kernel accepts no further operations.
    #[error("system has shut down")]
    SystemHalted,

    #[error("no process with ID = {0} exists")]
    ProcessNotFound(ProcessId),

    #[error("recipient process (ID = {0}) does not exist in system")]
    RecipientNotFound(ProcessId),

    #[error("process (ID = {0}) cannot send message to self")]
    SelfMessage(ProcessId),
}

impl KernelError {
    /// Coarse classification used for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::InvalidPriority { .. }
            | KernelError::InvalidSemaphoreId { .. }
            | KernelError::InvalidSemaphoreValue(_) => ErrorKind::Validation,
            KernelError::SemaphoreAlreadyCreated(_)
            | KernelError::SemaphoreNotCreated(_)
            | KernelError::NotSendBlocked(_)
            | KernelError::CannotForkInit
            | KernelError::InitProtection { .. }
            | KernelError::SystemHalted => ErrorKind::StateConflict,
            KernelError::ProcessNotFound(_) | KernelError::RecipientNotFound(_) => {
                ErrorKind::Lookup
            }
            KernelError::SelfMessage(_) => ErrorKind::SelfTarget,
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// The family a [`KernelError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An argument was out of range.
    Validation,
    /// The request conflicts with current kernel state.
    StateConflict,
    /// The target process does not exist.
    Lookup,
    /// A process addressed itself.
    SelfTarget,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::StateConflict => write!(f, "state-conflict"),
            ErrorKind::Lookup => write!(f, "lookup"),
            ErrorKind::SelfTarget => write!(f, "self-target"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
