//! Turning kernel events and views into terminal output.
//!
//! [`Renderer`] owns the output format and the color palette. Every method
//! returns the full text for one command so the caller decides where it goes.

use crate::colors::Palette;
use crate::command::{CommandError, COMMANDS};
use ossim_runtime::semaphore::SemaphoreStatus;
use ossim_runtime::{
    KernelEvent, Message, ProcessId, ProcessInfo, ProcessState, SemaphoreInfo, SystemSnapshot,
};
use serde::Serialize;
use std::fmt::Write as _;

pub const PROMPT_BANNER: &str =
    "Prompt: Please input an OS Command (separate params with space or comma)";
pub const PROMPT: &str = "> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, optionally colored text.
    #[default]
    Text,
    /// One JSON object per command.
    Json,
}

// ---------------------------------------------------------------------------
// JSON payloads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonLine<'a> {
    Events { events: &'a [KernelEvent] },
    Info { process: &'a ProcessInfo },
    Snapshot { snapshot: &'a SystemSnapshot },
    Error { kind: String, message: String },
    Help { commands: Vec<JsonCommand> },
}

#[derive(Serialize)]
struct JsonCommand {
    letter: &'static str,
    name: &'static str,
    usage: &'static str,
    summary: &'static str,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Renderer {
    palette: Palette,
    format: OutputFormat,
}

impl Renderer {
    pub fn new(palette: Palette, format: OutputFormat) -> Self {
        // JSON consumers never want escape codes.
        let palette = match format {
            OutputFormat::Json => Palette::plain(),
            OutputFormat::Text => palette,
        };
        Self { palette, format }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn events(&self, events: &[KernelEvent]) -> String {
        match self.format {
            OutputFormat::Json => json_line(&JsonLine::Events { events }),
            OutputFormat::Text => {
                let mut out = String::new();
                for event in events {
                    out.push_str(&self.event(event));
                    out.push('\n');
                }
                out
            }
        }
    }

    pub fn info(&self, info: &ProcessInfo) -> String {
        if self.format == OutputFormat::Json {
            return json_line(&JsonLine::Info { process: info });
        }
        let line = if info.is_init {
            format!(
                "SUCCESS: INIT PROCESS (ID = {}) (STATE = {}) (TOTAL CPU-Bursts = {})",
                info.id, info.state, info.bursts
            )
        } else {
            format!(
                "SUCCESS: PROCESS (ID = {}) (STATE = {}) (PRIORITY LEVEL = {}){}",
                info.id,
                info.state,
                info.priority,
                aging_suffix(info)
            )
        };
        format!("{}\n", self.palette.green(&line))
    }

    pub fn error(&self, err: &CommandError) -> String {
        match self.format {
            OutputFormat::Json => json_line(&JsonLine::Error {
                kind: error_kind(err),
                message: err.to_string(),
            }),
            OutputFormat::Text => format!("{}\n", self.palette.red(&format!("ERROR: {}", err))),
        }
    }

    pub fn help(&self) -> String {
        if self.format == OutputFormat::Json {
            let commands = COMMANDS
                .iter()
                .map(|c| JsonCommand {
                    letter: c.letter,
                    name: c.name,
                    usage: c.usage,
                    summary: c.summary,
                })
                .collect();
            return json_line(&JsonLine::Help { commands });
        }
        let mut out = format!("{}\n", self.palette.bold("Commands:"));
        for spec in COMMANDS {
            let _ = writeln!(
                out,
                "  {}  {:<10} {}",
                self.palette.cyan(&format!("{:<34}", spec.usage)),
                spec.name,
                self.palette.gray(spec.summary)
            );
        }
        out
    }

    /// The two prompt lines shown before each command in text mode.
    pub fn prompt(&self) -> String {
        match self.format {
            OutputFormat::Json => String::new(),
            OutputFormat::Text => format!("{}\n{}", self.palette.bold(PROMPT_BANNER), PROMPT),
        }
    }

    /// Shown when input ends while the kernel is still up.
    pub fn farewell(&self) -> Option<String> {
        match self.format {
            OutputFormat::Json => None,
            OutputFormat::Text => Some(format!(
                "{}\n",
                self.palette.cyan("OS: End of input ... Goodbye")
            )),
        }
    }

    // -- single events ----------------------------------------------------

    fn event(&self, event: &KernelEvent) -> String {
        let p = &self.palette;
        match event {
            KernelEvent::ProcessCreated { process } => {
                p.green(&format!("SUCCESS: CREATED {}", process_line(process)))
            }
            KernelEvent::ProcessForked { parent, child } => format!(
                "{}\n{}",
                p.green(&format!("SUCCESS: FORKED RUNNING PROCESS (ID = {})", parent)),
                p.green(&format!(" --> {}", process_line(child)))
            ),
            KernelEvent::Dispatched { process } => format!(
                "{}{}",
                p.cyan("OS: now running - "),
                process_line(process)
            ),
            KernelEvent::MessageDelivered { message } => p.green(&format!(
                "SUCCESS: Received message \"{}\" (SenderID = {}, recipientProcessID = {})",
                message.text(),
                message.sender(),
                message.recipient()
            )),
            KernelEvent::PriorityChanged { pid, from, to, .. } => {
                let verb = if to < from { "PROMOTED" } else { "DEMOTED" };
                p.cyan(&format!(
                    "OS: PROCESS (ID = {}) {} PRIORITY LEVEL ({} -> {})",
                    pid, verb, from, to
                ))
            }
            KernelEvent::Blocked { pid, state } => p.cyan(&blocked_line(*pid, *state)),
            KernelEvent::Unblocked { pid, from } => p.cyan(&unblocked_line(*pid, *from)),
            KernelEvent::MessageSent { message } => p.green(&format!(
                "SUCCESS: Process (ID = {}) Sent Message \"{}\" to Process (ID = {})",
                message.sender(),
                message.text(),
                message.recipient()
            )),
            KernelEvent::ReplySent { message } => p.green(&format!(
                "SUCCESS: Process (ID = {}) Sent a Reply Message \"{}\" to Process (ID = {})",
                message.sender(),
                message.text(),
                message.recipient()
            )),
            KernelEvent::MessageReceived { message } => p.green(&format!(
                "SUCCESS: Received message (SenderID = {}, recipientProcessID = {}) - \"{}\"",
                message.sender(),
                message.recipient(),
                message.text()
            )),
            KernelEvent::NoMessage { pid } => {
                let who = if pid.is_init() {
                    format!("INIT PROCESS (ID = {})", pid)
                } else {
                    format!("PROCESS (ID = {})", pid)
                };
                p.green(&format!("SUCCESS: No messages sent to {}", who))
            }
            KernelEvent::Terminated {
                pid,
                prior_state,
                voluntary,
            } => {
                let action = if *voluntary { "EXITED" } else { "KILLED" };
                let line = if pid.is_init() {
                    format!("SUCCESS: {} INIT PROCESS (ID = {})", action, pid)
                } else {
                    format!(
                        "SUCCESS: {} PROCESS (ID = {}) (State = {})",
                        action, pid, prior_state
                    )
                };
                p.green(&line)
            }
            KernelEvent::SemaphoreCreated { id, value } => p.green(&format!(
                "SUCCESS: Semaphore (ID = {}) (value = {}) CREATED",
                id, value
            )),
            KernelEvent::SemaphoreWaited { id, from, to } => p.green(&format!(
                "SUCCESS: P operation on Semaphore (ID = {}) ({} -> {})",
                id, from, to
            )),
            KernelEvent::SemaphoreSignalled { id, from, to } => p.green(&format!(
                "SUCCESS: V operation on Semaphore (ID = {}) ({} -> {})",
                id, from, to
            )),
            KernelEvent::Shutdown => p.cyan("OS: System Shutting Down ... Goodbye"),
        }
    }

    // -- total system info ------------------------------------------------

    pub fn snapshot(&self, snap: &SystemSnapshot) -> String {
        if self.format == OutputFormat::Json {
            return json_line(&JsonLine::Snapshot { snapshot: snap });
        }
        let p = &self.palette;
        let mut out = String::new();
        let _ = writeln!(out, "-------------- TOTAL SYSTEM INFO --------------");
        let _ = writeln!(
            out,
            "{}\n",
            p.cyan(&format!(
                "OS: Number of Processes in System = {}",
                snap.process_count
            ))
        );
        let _ = writeln!(out, "{}", p.cyan("OS: Currently Running Process"));
        match &snap.running {
            Some(info) => {
                let _ = writeln!(out, "\t{}\n", process_line(info));
            }
            None => {
                let _ = writeln!(out, "\tNONE - System Halted\n");
            }
        }

        for (level, queue) in snap.ready.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}",
                p.cyan(&format!(
                    "OS: Ready Queue (Priority Level = {}) - Process List",
                    level
                ))
            );
            if queue.is_empty() {
                let _ = writeln!(out, "\tEMPTY - No Processes In Queue\n");
            } else {
                let _ = writeln!(
                    out,
                    "\tCOUNT - {} (NEXT TO RUN -> 1 ... {} -> LAST TO RUN)",
                    queue.len(),
                    queue.len()
                );
                push_numbered(&mut out, queue.iter().map(process_line));
            }
        }

        let blocked = [
            ("SEND-BLOCKED", &snap.send_blocked),
            ("RECEIVE-BLOCKED", &snap.receive_blocked),
        ];
        for (label, queue) in blocked {
            let _ = writeln!(
                out,
                "{}",
                p.cyan(&format!("OS: {} Queue - Process List", label))
            );
            if queue.is_empty() {
                let _ = writeln!(out, "\tEMPTY - No Processes {}\n", label);
            } else {
                let _ = writeln!(out, "\tCOUNT - {}", queue.len());
                push_numbered(&mut out, queue.iter().map(process_line));
            }
        }

        let _ = writeln!(out, "{}", p.cyan("OS: MESSAGES Queue - Messages List"));
        if snap.messages.is_empty() {
            let _ = writeln!(out, "\tEMPTY - No Messages Waiting\n");
        } else {
            let _ = writeln!(out, "\tCOUNT - {}", snap.messages.len());
            push_numbered(&mut out, snap.messages.iter().map(message_line));
        }

        let _ = writeln!(out, "{}", p.cyan("OS: SEMAPHORES List"));
        for sem in &snap.semaphores {
            push_semaphore(&mut out, sem);
        }
        let _ = writeln!(out, "------------- END Of SYSTEM INFO -------------");
        out
    }
}

// ---------------------------------------------------------------------------
// Line helpers
// ---------------------------------------------------------------------------

/// The one-line description of a process used throughout the output.
pub fn process_line(info: &ProcessInfo) -> String {
    if info.is_init {
        format!(
            "INIT PROCESS (ID = {}) ({}) (TOTAL CPU-Bursts = {})",
            info.id, info.state, info.bursts
        )
    } else {
        format!(
            "PROCESS (ID = {}) ({}) (PRIORITY = {}){}",
            info.id,
            info.state,
            info.priority,
            aging_suffix(info)
        )
    }
}

fn aging_suffix(info: &ProcessInfo) -> String {
    match (info.bursts_remaining, info.direction) {
        (Some(left), Some(direction)) => {
            format!(" ({} CPU-Bursts until {})", left, direction.goal())
        }
        _ => String::new(),
    }
}

fn message_line(message: &Message) -> String {
    format!(
        "Message: {} (SenderID = {}, RecipientID = {})",
        message.text(),
        message.sender(),
        message.recipient()
    )
}

fn blocked_line(pid: ProcessId, state: ProcessState) -> String {
    match state {
        ProcessState::SendBlocked => format!("OS: Process (ID = {}) is SEND-BLOCKED", pid),
        ProcessState::ReceiveBlocked => {
            format!("OS: Running Process (ID = {}) is RECEIVE-BLOCKED", pid)
        }
        ProcessState::SemBlocked => format!("OS: PROCESS (ID = {}) has been SEM-BLOCKED", pid),
        other => format!("OS: PROCESS (ID = {}) is {}", pid, other),
    }
}

fn unblocked_line(pid: ProcessId, from: ProcessState) -> String {
    match from {
        ProcessState::SendBlocked => format!("OS: Process (ID = {}) is SEND-UNBLOCKED", pid),
        ProcessState::ReceiveBlocked => {
            format!("OS: Process (ID = {}) is RECEIVE-UNBLOCKED", pid)
        }
        ProcessState::SemBlocked => format!("OS: PROCESS (ID = {}) SEM-UNBLOCKED", pid),
        other => format!("OS: PROCESS (ID = {}) left {}", pid, other),
    }
}

fn push_numbered(out: &mut String, lines: impl Iterator<Item = String>) {
    for (i, line) in lines.enumerate() {
        let _ = writeln!(out, "\t{}. {}", i + 1, line);
    }
    out.push('\n');
}

fn push_semaphore(out: &mut String, sem: &SemaphoreInfo) {
    if sem.status == SemaphoreStatus::NotCreated {
        let _ = writeln!(out, "\tSemaphore (ID = {}), Status: NOT CREATED", sem.id);
        return;
    }
    let _ = writeln!(
        out,
        "\tSemaphore (ID = {}), Status: CREATED - Value = {}",
        sem.id, sem.value
    );
    if sem.waiters.is_empty() {
        let _ = writeln!(out, "\tNo processes SEM-BLOCKED\n");
    } else {
        let _ = writeln!(out, "\tProcesses SEM-BLOCKED: {}", sem.waiters.len());
        push_numbered(out, sem.waiters.iter().map(process_line));
    }
}

fn error_kind(err: &CommandError) -> String {
    match err {
        CommandError::Kernel(e) => e.kind().to_string(),
        CommandError::UnknownCommand(_)
        | CommandError::MissingArgument { .. }
        | CommandError::InvalidArgument { .. } => "usage".to_string(),
    }
}

fn json_line<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(s) => format!("{}\n", s),
        Err(e) => format!(
            "{{\"type\":\"error\",\"kind\":\"internal\",\"message\":{:?}}}\n",
            e.to_string()
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ossim_runtime::{Kernel, KernelError};

    fn plain() -> Renderer {
        Renderer::new(Palette::plain(), OutputFormat::Text)
    }

    #[test]
    fn create_prints_process_line() {
        let mut kernel = Kernel::default();
        let events = kernel.create_process(1).unwrap();
        let out = plain().events(&events);
        assert!(out.starts_with(
            "SUCCESS: CREATED PROCESS (ID = 1) (READY) (PRIORITY = 1) (5 CPU-Bursts until DEMOTION)\n"
        ));
        assert!(out.contains("OS: now running - PROCESS (ID = 1) (RUNNING) (PRIORITY = 1)"));
    }

    #[test]
    fn init_line_reports_total_bursts() {
        let kernel = Kernel::default();
        let info = kernel.process_info(ProcessId::INIT).unwrap();
        assert_eq!(
            process_line(&info),
            "INIT PROCESS (ID = 0) (RUNNING) (TOTAL CPU-Bursts = 0)"
        );
        assert_eq!(
            plain().info(&info),
            "SUCCESS: INIT PROCESS (ID = 0) (STATE = RUNNING) (TOTAL CPU-Bursts = 0)\n"
        );
    }

    #[test]
    fn errors_are_prefixed() {
        let err = CommandError::UnknownCommand("Z".to_string());
        assert_eq!(plain().error(&err), "ERROR: \"Z\" is not a recognized command\n");
        let err = CommandError::Kernel(KernelError::CannotForkInit);
        assert_eq!(
            plain().error(&err),
            "ERROR: cannot fork INIT process (ID = 0)\n"
        );
    }

    #[test]
    fn json_errors_carry_kind() {
        let r = Renderer::new(Palette::default(), OutputFormat::Json);
        let out = r.error(&CommandError::Kernel(KernelError::SelfMessage(ProcessId::new(1))));
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "self-target");
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn json_events_are_one_line() {
        let mut kernel = Kernel::default();
        let events = kernel.create_process(0).unwrap();
        let r = Renderer::new(Palette::plain(), OutputFormat::Json);
        let out = r.events(&events);
        assert_eq!(out.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["type"], "events");
        assert_eq!(value["events"][0]["event"], "process_created");
        assert_eq!(value["events"][1]["event"], "dispatched");
    }

    #[test]
    fn blocking_lines_match_state() {
        assert_eq!(
            blocked_line(ProcessId::new(3), ProcessState::ReceiveBlocked),
            "OS: Running Process (ID = 3) is RECEIVE-BLOCKED"
        );
        assert_eq!(
            unblocked_line(ProcessId::new(3), ProcessState::SemBlocked),
            "OS: PROCESS (ID = 3) SEM-UNBLOCKED"
        );
    }

    #[test]
    fn snapshot_lists_every_section() {
        let mut kernel = Kernel::default();
        kernel.create_process(2).unwrap();
        kernel.create_process(2).unwrap();
        kernel.new_semaphore(0, 0).unwrap();
        let out = plain().snapshot(&kernel.snapshot());

        assert!(out.starts_with("-------------- TOTAL SYSTEM INFO --------------\n"));
        assert!(out.contains("OS: Number of Processes in System = 3"));
        assert!(out.contains("OS: Ready Queue (Priority Level = 0) - Process List\n\tEMPTY - No Processes In Queue"));
        assert!(out.contains("\t1. PROCESS (ID = 2) (READY) (PRIORITY = 2)"));
        assert!(out.contains("\tEMPTY - No Processes SEND-BLOCKED"));
        assert!(out.contains("\tEMPTY - No Messages Waiting"));
        assert!(out.contains("\tSemaphore (ID = 0), Status: CREATED - Value = 0\n\tNo processes SEM-BLOCKED"));
        assert!(out.contains("\tSemaphore (ID = 1), Status: NOT CREATED"));
        assert!(out.ends_with("------------- END Of SYSTEM INFO -------------\n"));
    }

    #[test]
    fn help_lists_every_command() {
        let out = plain().help();
        for spec in COMMANDS {
            assert!(out.contains(spec.usage));
        }
    }
}
