//! Synchronous message passing between simulated processes.
//!
//! The [`Mailbox`] owns three containers:
//!
//! * undelivered [`Message`]s, searched linearly by recipient;
//! * processes blocked after sending, waiting for a reply;
//! * processes blocked in receive, waiting for a message.
//!
//! The blocking policy itself (who gets parked, when the dispatcher runs)
//! lives on [`Kernel`](crate::Kernel); this module only moves values in and
//! out of the containers.

use crate::process::{Pcb, ProcessId, ProcessState};
use crate::queue::FifoQueue;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Text substituted for an empty message body.
pub const BLANK_MESSAGE: &str = "<Blank Message>";

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// An immutable message between two processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sender: ProcessId,
    recipient: ProcessId,
    text: String,
}

impl Message {
    /// Build a message, bounding `text` to `max_len` characters.
    ///
    /// Empty text is replaced with [`BLANK_MESSAGE`].
    pub fn new(sender: ProcessId, recipient: ProcessId, text: &str, max_len: usize) -> Self {
        let text = if text.is_empty() {
            BLANK_MESSAGE.to_string()
        } else {
            text.chars().take(max_len).collect()
        };
        Self {
            sender,
            recipient,
            text,
        }
    }

    pub fn sender(&self) -> ProcessId {
        self.sender
    }

    pub fn recipient(&self) -> ProcessId {
        self.recipient
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

/// Undelivered messages plus the two IPC-blocked queues.
#[derive(Debug, Default)]
pub struct Mailbox {
    pub(crate) messages: FifoQueue<Message>,
    pub(crate) send_blocked: FifoQueue<Pcb>,
    pub(crate) receive_blocked: FifoQueue<Pcb>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    // -- messages ---------------------------------------------------------

    /// Leave a message for later pickup.
    pub(crate) fn post(&mut self, message: Message) {
        debug!(
            sender = %message.sender,
            recipient = %message.recipient,
            "message queued"
        );
        self.messages.push(message);
    }

    /// Remove the oldest message addressed to `recipient`.
    pub(crate) fn take_for(&mut self, recipient: ProcessId) -> Option<Message> {
        self.messages.remove_first(|m| m.recipient == recipient)
    }

    /// Undelivered messages in arrival order.
    pub fn messages(&self) -> &FifoQueue<Message> {
        &self.messages
    }

    // -- blocked queues ---------------------------------------------------

    pub(crate) fn park_sender(&mut self, mut pcb: Pcb) {
        pcb.state = ProcessState::SendBlocked;
        self.send_blocked.push(pcb);
    }

    pub(crate) fn park_receiver(&mut self, mut pcb: Pcb) {
        pcb.state = ProcessState::ReceiveBlocked;
        self.receive_blocked.push(pcb);
    }

    pub(crate) fn release_sender(&mut self, pid: ProcessId) -> Option<Pcb> {
        self.send_blocked.remove_first(|p| p.id == pid)
    }

    pub(crate) fn release_receiver(&mut self, pid: ProcessId) -> Option<Pcb> {
        self.receive_blocked.remove_first(|p| p.id == pid)
    }

    pub fn is_send_blocked(&self, pid: ProcessId) -> bool {
        self.send_blocked.contains(|p| p.id == pid)
    }

    pub fn is_receive_blocked(&self, pid: ProcessId) -> bool {
        self.receive_blocked.contains(|p| p.id == pid)
    }

    /// Processes waiting for a reply, longest waiter first.
    pub fn send_blocked(&self) -> &FifoQueue<Pcb> {
        &self.send_blocked
    }

    /// Processes waiting for a message, longest waiter first.
    pub fn receive_blocked(&self) -> &FifoQueue<Pcb> {
        &self.receive_blocked
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
