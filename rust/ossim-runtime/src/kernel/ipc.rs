//! Synchronous message passing: send blocks until replied to, receive
//! blocks until something arrives, reply never blocks.
//!
//! INIT takes part like any other process except that it never blocks.
//! Where a regular caller would be parked, INIT instead gives up the CPU so
//! that whoever just became ready can run.

use super::Kernel;
use crate::error::{KernelError, KernelResult};
use crate::event::KernelEvent;
use crate::mailbox::Message;
use crate::process::{ProcessId, ProcessState};
use tracing::debug;

impl Kernel {
    /// Send `text` to `recipient` and wait for a reply.
    ///
    /// A recipient already blocked in receive gets the message at once and
    /// becomes ready. Otherwise the message waits in the mailbox.
    pub fn send(&mut self, recipient: ProcessId, text: &str) -> KernelResult<Vec<KernelEvent>> {
        let caller = self.caller()?;
        if recipient == caller {
            return Err(KernelError::SelfMessage(recipient));
        }
        if !self.exists(recipient) {
            return Err(KernelError::RecipientNotFound(recipient));
        }

        let message = Message::new(caller, recipient, text, self.config.max_message_len);
        self.emit(KernelEvent::MessageSent {
            message: message.clone(),
        });

        match self.mailbox.release_receiver(recipient) {
            Some(mut pcb) => {
                debug!(pid = %pcb.id, "receive-unblocked by send");
                pcb.attach_message(message);
                self.emit(KernelEvent::Unblocked {
                    pid: pcb.id,
                    from: ProcessState::ReceiveBlocked,
                });
                self.scheduler.admit(pcb);
            }
            None => self.mailbox.post(message),
        }

        if let Some(pcb) = self.take_runner_for_block(ProcessState::SendBlocked) {
            self.mailbox.park_sender(pcb);
        }
        self.dispatch();
        Ok(self.finish())
    }

    /// Collect the oldest message addressed to the caller.
    ///
    /// With nothing waiting, a regular caller blocks until a send arrives.
    /// INIT just reports the empty mailbox and carries on.
    pub fn receive(&mut self) -> KernelResult<Vec<KernelEvent>> {
        let caller = self.caller()?;

        if let Some(message) = self.mailbox.take_for(caller) {
            self.emit(KernelEvent::MessageReceived {
                message: message.clone(),
            });
            match self.scheduler.running_pcb_mut() {
                Some(pcb) => pcb.attach_message(message),
                None => self.scheduler.idle.pending = Some(message),
            }
            return Ok(self.finish());
        }

        self.emit(KernelEvent::NoMessage { pid: caller });
        if let Some(pcb) = self.take_runner_for_block(ProcessState::ReceiveBlocked) {
            self.mailbox.park_receiver(pcb);
            self.dispatch();
        }
        Ok(self.finish())
    }

    /// Answer a process that is waiting in send.
    ///
    /// The replier keeps the CPU unless it is INIT.
    pub fn reply(&mut self, recipient: ProcessId, text: &str) -> KernelResult<Vec<KernelEvent>> {
        let caller = self.caller()?;
        if recipient == caller {
            return Err(KernelError::SelfMessage(recipient));
        }
        if !self.mailbox.is_send_blocked(recipient) {
            return Err(KernelError::NotSendBlocked(recipient));
        }

        let message = Message::new(caller, recipient, text, self.config.max_message_len);
        self.emit(KernelEvent::ReplySent {
            message: message.clone(),
        });

        match self.mailbox.release_sender(recipient) {
            Some(mut pcb) => {
                debug!(pid = %pcb.id, "send-unblocked by reply");
                pcb.attach_message(message);
                self.emit(KernelEvent::Unblocked {
                    pid: pcb.id,
                    from: ProcessState::SendBlocked,
                });
                self.scheduler.admit(pcb);
            }
            None => self.mailbox.post(message),
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

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> ProcessId {
        ProcessId::new(n)
    }

    /// Kernel with processes 1..=n all at level 0; 1 is running.
    fn kernel_with(n: u32) -> Kernel {
        let mut k = Kernel::default();
        for _ in 0..n {
            k.create_process(0).unwrap();
        }
        k
    }

    #[test]
    fn send_to_self_is_rejected() {
        let mut k = kernel_with(1);
        assert_eq!(k.send(pid(1), "hi"), Err(KernelError::SelfMessage(pid(1))));
        assert_eq!(k.reply(pid(1), "hi"), Err(KernelError::SelfMessage(pid(1))));
    }

    #[test]
    fn send_to_missing_recipient_is_rejected() {
        let mut k = kernel_with(1);
        assert_eq!(
            k.send(pid(9), "hi"),
            Err(KernelError::RecipientNotFound(pid(9)))
        );
        assert_eq!(k.running_id(), Some(pid(1)));
    }

    #[test]
    fn send_blocks_sender_and_queues_message() {
        let mut k = kernel_with(2);
        let events = k.send(pid(2), "hello").unwrap();
        assert!(matches!(events[0], KernelEvent::MessageSent { .. }));
        assert_eq!(
            events[1],
            KernelEvent::Blocked {
                pid: pid(1),
                state: ProcessState::SendBlocked
            }
        );
        assert_eq!(k.running_id(), Some(pid(2)));
        assert!(k.mailbox().is_send_blocked(pid(1)));
        assert_eq!(k.mailbox().messages().len(), 1);
    }

    #[test]
    fn send_wakes_receive_blocked_recipient() {
        let mut k = kernel_with(2);
        k.receive().unwrap();
        assert!(k.mailbox().is_receive_blocked(pid(1)));
        assert_eq!(k.running_id(), Some(pid(2)));

        let events = k.send(pid(1), "wake").unwrap();
        assert!(events.contains(&KernelEvent::Unblocked {
            pid: pid(1),
            from: ProcessState::ReceiveBlocked
        }));
        assert!(k.mailbox().messages().is_empty());
        assert_eq!(k.running_id(), Some(pid(1)));
        assert!(matches!(
            events.last(),
            Some(KernelEvent::MessageDelivered { message }) if message.text() == "wake"
        ));
    }

    #[test]
    fn receive_takes_queued_message_without_blocking() {
        let mut k = kernel_with(2);
        k.send(pid(2), "ping").unwrap();
        let events = k.receive().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            KernelEvent::MessageReceived { message } if message.sender() == pid(1)
        ));
        assert_eq!(k.running_id(), Some(pid(2)));
    }

    #[test]
    fn init_receive_never_blocks() {
        let mut k = Kernel::default();
        let events = k.receive().unwrap();
        assert_eq!(
            events,
            vec![KernelEvent::NoMessage {
                pid: ProcessId::INIT
            }]
        );
        assert!(k.init_is_running());
    }

    #[test]
    fn reply_requires_send_blocked_recipient() {
        let mut k = kernel_with(2);
        assert_eq!(
            k.reply(pid(2), "nope"),
            Err(KernelError::NotSendBlocked(pid(2)))
        );
    }

    #[test]
    fn reply_unblocks_sender_and_replier_keeps_cpu() {
        let mut k = kernel_with(2);
        k.send(pid(2), "question").unwrap();
        let events = k.reply(pid(1), "answer").unwrap();
        assert!(events.contains(&KernelEvent::Unblocked {
            pid: pid(1),
            from: ProcessState::SendBlocked
        }));
        assert_eq!(k.running_id(), Some(pid(2)));
        let waiting = k.find_anywhere(pid(1)).unwrap();
        assert_eq!(waiting.state(), ProcessState::Ready);
        assert_eq!(waiting.pending_message().unwrap().text(), "answer");
    }

    #[test]
    fn empty_text_uses_placeholder() {
        let mut k = kernel_with(2);
        let events = k.send(pid(2), "").unwrap();
        assert!(matches!(
            &events[0],
            KernelEvent::MessageSent { message } if message.text() == crate::mailbox::BLANK_MESSAGE
        ));
    }
}
