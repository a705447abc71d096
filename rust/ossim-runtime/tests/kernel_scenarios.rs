//! End-to-end command sequences against a fresh kernel.

use ossim_runtime::{
    Kernel, KernelConfig, KernelError, KernelEvent, PriorityDirection, ProcessId, ProcessState,
};

fn pid(n: u32) -> ProcessId {
    ProcessId::new(n)
}

fn dispatched(events: &[KernelEvent]) -> Vec<ProcessId> {
    events
        .iter()
        .filter_map(|e| match e {
            KernelEvent::Dispatched { process } => Some(process.id),
            _ => None,
        })
        .collect()
}

/// Number of RUNNING processes visible in a snapshot.
fn running_count(k: &Kernel) -> usize {
    let snap = k.snapshot();
    let queued = snap
        .ready
        .iter()
        .flatten()
        .chain(&snap.send_blocked)
        .chain(&snap.receive_blocked)
        .chain(snap.semaphores.iter().flat_map(|s| &s.waiters))
        .filter(|p| p.state == ProcessState::Running)
        .count();
    queued + usize::from(snap.running.is_some())
}

// =============================================================================
// Creation and ids
// =============================================================================

#[test]
fn created_ids_strictly_increase() {
    let mut k = Kernel::default();
    let mut last = 0;
    for priority in [0, 2, 1, 1, 0] {
        let events = k.create_process(priority).unwrap();
        let created = match &events[0] {
            KernelEvent::ProcessCreated { process } => process.clone(),
            other => panic!("expected creation, got {other:?}"),
        };
        assert!(created.id.as_u32() > last);
        assert_eq!(created.priority, priority as usize);
        assert_eq!(created.state, ProcessState::Ready);
        last = created.id.as_u32();
    }
}

#[test]
fn ids_are_not_reused_after_kill() {
    let mut k = Kernel::default();
    k.create_process(1).unwrap();
    k.create_process(1).unwrap();
    k.kill(pid(2)).unwrap();
    let events = k.create_process(1).unwrap();
    assert!(matches!(
        &events[0],
        KernelEvent::ProcessCreated { process } if process.id == pid(3)
    ));
}

// =============================================================================
// Scheduling
// =============================================================================

#[test]
fn at_most_one_runner_and_init_fills_gaps() {
    let mut k = Kernel::default();
    assert!(k.init_is_running());
    k.create_process(1).unwrap();
    k.create_process(1).unwrap();
    for _ in 0..7 {
        k.quantum_expired().unwrap();
        assert_eq!(running_count(&k), 1);
    }
    k.kill(pid(1)).unwrap();
    k.kill(pid(2)).unwrap();
    assert!(k.init_is_running());
}

#[test]
fn same_priority_runs_in_arrival_order() {
    let mut k = Kernel::default();
    k.new_semaphore(0, 0).unwrap();
    // INIT creates A; A creates B and C at its own level.
    k.create_process(1).unwrap();
    k.create_process(1).unwrap();
    k.create_process(1).unwrap();

    let mut order = vec![k.running_id().unwrap()];
    // Each runner parks itself on the semaphore so the next one is dispatched.
    for _ in 0..2 {
        let events = k.semaphore_wait(0).unwrap();
        order.extend(dispatched(&events));
    }
    assert_eq!(order, vec![pid(1), pid(2), pid(3)]);
}

#[test]
fn lowest_level_process_promotes_after_five_quanta() {
    let mut k = Kernel::default();
    k.create_process(2).unwrap();
    let mut changes = Vec::new();
    for _ in 0..5 {
        let events = k.quantum_expired().unwrap();
        changes.extend(
            events
                .into_iter()
                .filter(|e| matches!(e, KernelEvent::PriorityChanged { .. })),
        );
    }
    assert_eq!(
        changes,
        vec![KernelEvent::PriorityChanged {
            pid: pid(1),
            from: 2,
            to: 1,
            direction: PriorityDirection::Promoting,
        }]
    );
    let info = k.process_info(pid(1)).unwrap();
    assert_eq!(info.priority, 1);
    assert_eq!(info.bursts, 0);
    assert_eq!(info.bursts_remaining, Some(5));
}

#[test]
fn blocking_does_not_age_the_runner() {
    let mut k = Kernel::default();
    k.create_process(0).unwrap();
    k.create_process(0).unwrap();
    k.receive().unwrap();
    let blocked = k.process_info(pid(1)).unwrap();
    assert_eq!(blocked.bursts, 0);
    assert_eq!(blocked.state, ProcessState::ReceiveBlocked);
}

#[test]
fn custom_config_changes_threshold_and_levels() {
    let cfg = KernelConfig {
        priority_levels: 2,
        aging_threshold: 2,
        ..KernelConfig::default()
    };
    let mut k = Kernel::new(cfg).unwrap();
    assert_eq!(
        k.create_process(2),
        Err(KernelError::InvalidPriority {
            requested: 2,
            lowest: 1
        })
    );
    k.create_process(1).unwrap();
    k.quantum_expired().unwrap();
    let events = k.quantum_expired().unwrap();
    assert!(events.contains(&KernelEvent::PriorityChanged {
        pid: pid(1),
        from: 1,
        to: 0,
        direction: PriorityDirection::Promoting,
    }));
}

// =============================================================================
// Semaphores
// =============================================================================

#[test]
fn waiters_queue_in_order_and_release_first() {
    let mut k = Kernel::default();
    k.create_process(0).unwrap(); // X = 1, running
    k.create_process(0).unwrap(); // Y = 2
    k.create_process(0).unwrap(); // Z = 3
    k.new_semaphore(0, 0).unwrap();

    k.semaphore_wait(0).unwrap(); // X blocks, Y runs
    k.semaphore_wait(0).unwrap(); // Y blocks, Z runs

    let snap = k.snapshot();
    let sem = snap.semaphore(0).unwrap();
    assert_eq!(sem.value, -2);
    assert_eq!(
        sem.waiters.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![pid(1), pid(2)]
    );

    let events = k.semaphore_signal(0).unwrap();
    assert!(events.contains(&KernelEvent::Unblocked {
        pid: pid(1),
        from: ProcessState::SemBlocked
    }));
    let snap = k.snapshot();
    let sem = snap.semaphore(0).unwrap();
    assert_eq!(sem.value, -1);
    assert_eq!(sem.waiters.len(), 1);
    assert_eq!(snap.ready_ids(), vec![pid(1)]);
}

#[test]
fn semaphore_value_matches_waiter_count() {
    let mut k = Kernel::default();
    for _ in 0..4 {
        k.create_process(1).unwrap();
    }
    k.new_semaphore(2, 1).unwrap();
    for _ in 0..3 {
        k.semaphore_wait(2).unwrap();
    }
    let snap = k.snapshot();
    let sem = snap.semaphore(2).unwrap();
    assert_eq!(sem.value, -2);
    assert_eq!(sem.waiters.len(), 2);

    // Terminating a waiter leaves the value where it was.
    let waiter = sem.waiters[0].id;
    k.kill(waiter).unwrap();
    let snap = k.snapshot();
    let sem = snap.semaphore(2).unwrap();
    assert_eq!(sem.value, -2);
    assert_eq!(sem.waiters.len(), 1);
}

#[test]
fn new_semaphore_checks_id_before_value() {
    let mut k = Kernel::default();
    assert!(matches!(
        k.new_semaphore(9, -1),
        Err(KernelError::InvalidSemaphoreId { id: 9, .. })
    ));
    assert_eq!(
        k.new_semaphore(1, -1),
        Err(KernelError::InvalidSemaphoreValue(-1))
    );
}

// =============================================================================
// Messaging
// =============================================================================

#[test]
fn send_receive_reply_round_trip() {
    let mut k = Kernel::default();
    k.create_process(0).unwrap(); // A = 1
    k.create_process(0).unwrap(); // B = 2

    // A sends to B and blocks; B runs.
    k.send(pid(2), "request").unwrap();
    assert_eq!(k.running_id(), Some(pid(2)));

    // B picks the message up without blocking.
    let events = k.receive().unwrap();
    assert!(matches!(
        &events[0],
        KernelEvent::MessageReceived { message } if message.text() == "request"
    ));

    // B replies; A becomes ready holding the reply.
    k.reply(pid(1), "response").unwrap();
    assert_eq!(k.running_id(), Some(pid(2)));

    // When A is dispatched again the reply is delivered.
    let events = k.quantum_expired().unwrap();
    assert_eq!(dispatched(&events), vec![pid(1)]);
    assert!(matches!(
        events.last(),
        Some(KernelEvent::MessageDelivered { message })
            if message.text() == "response" && message.sender() == pid(2)
    ));
    assert!(k.process_info(pid(1)).is_ok());
}

#[test]
fn reply_to_ready_process_is_rejected() {
    let mut k = Kernel::default();
    k.create_process(0).unwrap();
    k.create_process(0).unwrap();
    assert_eq!(
        k.reply(pid(2), "x"),
        Err(KernelError::NotSendBlocked(pid(2)))
    );
}

#[test]
fn self_targeted_messages_fail() {
    let mut k = Kernel::default();
    assert_eq!(
        k.send(ProcessId::INIT, "me"),
        Err(KernelError::SelfMessage(ProcessId::INIT))
    );
    k.create_process(0).unwrap();
    assert_eq!(k.reply(pid(1), "me"), Err(KernelError::SelfMessage(pid(1))));
}

#[test]
fn long_messages_are_truncated() {
    let cfg = KernelConfig {
        max_message_len: 5,
        ..KernelConfig::default()
    };
    let mut k = Kernel::new(cfg).unwrap();
    k.create_process(0).unwrap();
    k.create_process(0).unwrap();
    let events = k.send(pid(2), "truncate me").unwrap();
    assert!(matches!(
        &events[0],
        KernelEvent::MessageSent { message } if message.text() == "trunc"
    ));
}

#[test]
fn init_can_message_processes() {
    let mut k = Kernel::default();
    k.create_process(0).unwrap();
    k.receive().unwrap(); // 1 blocks, INIT runs
    assert!(k.init_is_running());

    let events = k.send(pid(1), "from init").unwrap();
    assert_eq!(dispatched(&events), vec![pid(1)]);
    assert!(!k.mailbox().is_send_blocked(ProcessId::INIT));
}

// =============================================================================
// Termination
// =============================================================================

#[test]
fn init_protection_counts_other_processes() {
    let mut k = Kernel::default();
    k.create_process(0).unwrap();
    k.create_process(1).unwrap();
    assert_eq!(
        k.kill(ProcessId::INIT),
        Err(KernelError::InitProtection { remaining: 2 })
    );

    k.exit().unwrap(); // 1 exits, 2 runs
    k.exit().unwrap(); // 2 exits, INIT runs
    let events = k.kill(ProcessId::INIT).unwrap();
    assert_eq!(events.last(), Some(&KernelEvent::Shutdown));
    assert!(k.is_halted());
    assert_eq!(k.receive(), Err(KernelError::SystemHalted));

    let snap = k.snapshot();
    assert_eq!(snap.process_count, 0);
    assert!(snap.running.is_none());
    assert_eq!(k.count_all(), 0);
}

#[test]
fn killing_blocked_process_removes_it_everywhere() {
    let mut k = Kernel::default();
    k.create_process(0).unwrap();
    k.create_process(0).unwrap();
    k.new_semaphore(4, 0).unwrap();
    k.semaphore_wait(4).unwrap(); // 1 waits on sem 4

    let events = k.kill(pid(1)).unwrap();
    assert_eq!(
        events,
        vec![KernelEvent::Terminated {
            pid: pid(1),
            prior_state: ProcessState::SemBlocked,
            voluntary: false,
        }]
    );
    assert!(!k.exists(pid(1)));
    assert_eq!(k.count_all(), 2);
    let snap = k.snapshot();
    let sem = snap.semaphore(4).unwrap();
    assert_eq!(sem.value, -1);
    assert!(sem.waiters.is_empty());
}

#[test]
fn killed_waiter_keeps_its_unit_of_the_semaphore() {
    let mut k = Kernel::default();
    k.create_process(0).unwrap(); // 1 running
    k.create_process(0).unwrap(); // 2 ready
    k.new_semaphore(0, 0).unwrap();
    k.semaphore_wait(0).unwrap(); // 1 blocks, 2 runs
    assert_eq!(k.snapshot().semaphore(0).unwrap().value, -1);

    k.kill(pid(1)).unwrap();
    assert_eq!(k.snapshot().semaphore(0).unwrap().value, -1);

    // V only brings the value back to 0, so the next P blocks the caller.
    k.semaphore_signal(0).unwrap();
    assert_eq!(k.snapshot().semaphore(0).unwrap().value, 0);
    let events = k.semaphore_wait(0).unwrap();
    assert!(events.contains(&KernelEvent::Blocked {
        pid: pid(2),
        state: ProcessState::SemBlocked,
    }));
    let snap = k.snapshot();
    let sem = snap.semaphore(0).unwrap();
    assert_eq!(sem.value, -1);
    assert_eq!(sem.waiters.len(), 1);
    assert!(k.init_is_running());
}

#[test]
fn failed_operations_leave_state_untouched() {
    let mut k = Kernel::default();
    k.create_process(1).unwrap();
    let before = k.snapshot();
    assert!(k.kill(pid(42)).is_err());
    assert!(k.reply(pid(1), "x").is_err());
    assert!(k.semaphore_signal(0).is_err());
    assert!(k.create_process(99).is_err());
    assert_eq!(k.snapshot(), before);
}

// =============================================================================
// Snapshot
// =============================================================================

#[test]
fn snapshot_serializes_every_container() {
    let mut k = Kernel::default();
    k.create_process(0).unwrap();
    k.create_process(2).unwrap();
    k.send(pid(2), "queued").unwrap();

    let json = serde_json::to_value(k.snapshot()).unwrap();
    assert_eq!(json["process_count"], 3);
    assert_eq!(json["running"]["id"], 2);
    assert_eq!(json["ready"].as_array().unwrap().len(), 3);
    assert_eq!(json["send_blocked"][0]["id"], 1);
    assert_eq!(json["messages"][0]["text"], "queued");
    assert_eq!(json["semaphores"][0]["status"], "NOT_CREATED");
}
