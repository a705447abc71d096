//! OSSIM Runtime
//!
//! The control plane of a simulated single-CPU kernel: process control
//! blocks, a multilevel-feedback scheduler with priority aging, synchronous
//! send/receive/reply messaging, and a bank of counting semaphores.
//!
//! Everything hangs off one [`Kernel`] value. Each operation runs to
//! completion, returns the [`KernelEvent`]s it produced, and never prints.

pub mod config;
pub mod error;
pub mod event;
pub mod kernel;
pub mod mailbox;
pub mod process;
pub mod queue;
pub mod scheduler;
pub mod semaphore;
pub mod snapshot;

pub use config::{ConfigError, KernelConfig};
pub use error::{ErrorKind, KernelError, KernelResult};
pub use event::KernelEvent;
pub use kernel::Kernel;
pub use mailbox::Message;
pub use process::{Pcb, PriorityDirection, ProcessId, ProcessState};
pub use snapshot::{ProcessInfo, SemaphoreInfo, SystemSnapshot};
