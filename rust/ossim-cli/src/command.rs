//! Command parsing and execution.
//!
//! A command line is a command word followed by parameters separated by
//! spaces and/or commas. `S` and `Y` take the rest of the line as message
//! text. Command words are matched case-insensitively against the
//! [`COMMANDS`] table, by single letter or long name.

use ossim_runtime::{Kernel, KernelError, KernelEvent, ProcessId, ProcessInfo, SystemSnapshot};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("\"{0}\" is not a recognized command")]
    UnknownCommand(String),
    #[error("missing {argument} (usage: {usage})")]
    MissingArgument {
        argument: &'static str,
        usage: &'static str,
    },
    #[error("invalid {argument}: \"{value}\"")]
    InvalidArgument {
        argument: &'static str,
        value: String,
    },
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { priority: i64 },
    Fork,
    Kill { pid: ProcessId },
    Exit,
    Quantum,
    Send { pid: ProcessId, text: String },
    Receive,
    Reply { pid: ProcessId, text: String },
    NewSemaphore { id: i64, value: i64 },
    SemaphoreP { id: i64 },
    SemaphoreV { id: i64 },
    Info { pid: ProcessId },
    TotalInfo,
    Help,
}

/// What a successfully executed command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Events(Vec<KernelEvent>),
    Info(ProcessInfo),
    Snapshot(SystemSnapshot),
    Help,
}

impl Command {
    /// Run the command against `kernel`.
    pub fn execute(&self, kernel: &mut Kernel) -> Result<Outcome, CommandError> {
        let events = match self {
            Command::Create { priority } => kernel.create_process(*priority)?,
            Command::Fork => kernel.fork()?,
            Command::Kill { pid } => kernel.kill(*pid)?,
            Command::Exit => kernel.exit()?,
            Command::Quantum => kernel.quantum_expired()?,
            Command::Send { pid, text } => kernel.send(*pid, text)?,
            Command::Receive => kernel.receive()?,
            Command::Reply { pid, text } => kernel.reply(*pid, text)?,
            Command::NewSemaphore { id, value } => kernel.new_semaphore(*id, *value)?,
            Command::SemaphoreP { id } => kernel.semaphore_wait(*id)?,
            Command::SemaphoreV { id } => kernel.semaphore_signal(*id)?,
            Command::Info { pid } => return Ok(Outcome::Info(kernel.process_info(*pid)?)),
            Command::TotalInfo => return Ok(Outcome::Snapshot(kernel.snapshot())),
            Command::Help => return Ok(Outcome::Help),
        };
        Ok(Outcome::Events(events))
    }
}

// ---------------------------------------------------------------------------
// Command table
// ---------------------------------------------------------------------------

/// One row of the command table.
pub struct CommandSpec {
    pub letter: &'static str,
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    parse: fn(&mut Args<'_>, &'static str) -> Result<Command, CommandError>,
}

impl CommandSpec {
    fn matches(&self, word: &str) -> bool {
        word.eq_ignore_ascii_case(self.letter) || word.eq_ignore_ascii_case(self.name)
    }
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        letter: "C",
        name: "create",
        usage: "C <priority>",
        summary: "Create a process at a priority level and put it on the ready queue",
        parse: |args, usage| {
            Ok(Command::Create {
                priority: args.int("priority", usage)?,
            })
        },
    },
    CommandSpec {
        letter: "F",
        name: "fork",
        usage: "F",
        summary: "Copy the running process at its priority level",
        parse: |_, _| Ok(Command::Fork),
    },
    CommandSpec {
        letter: "K",
        name: "kill",
        usage: "K <pid>",
        summary: "Terminate a process by id",
        parse: |args, usage| {
            Ok(Command::Kill {
                pid: args.pid(usage)?,
            })
        },
    },
    CommandSpec {
        letter: "E",
        name: "exit",
        usage: "E",
        summary: "Terminate the running process",
        parse: |_, _| Ok(Command::Exit),
    },
    CommandSpec {
        letter: "Q",
        name: "quantum",
        usage: "Q",
        summary: "Expire the running process's time slice",
        parse: |_, _| Ok(Command::Quantum),
    },
    CommandSpec {
        letter: "S",
        name: "send",
        usage: "S <pid> <message>",
        summary: "Send a message and block until replied to",
        parse: |args, usage| {
            let pid = args.pid(usage)?;
            Ok(Command::Send {
                pid,
                text: args.rest().to_string(),
            })
        },
    },
    CommandSpec {
        letter: "R",
        name: "receive",
        usage: "R",
        summary: "Receive a message, blocking if none is waiting",
        parse: |_, _| Ok(Command::Receive),
    },
    CommandSpec {
        letter: "Y",
        name: "reply",
        usage: "Y <pid> <message>",
        summary: "Reply to a send-blocked process",
        parse: |args, usage| {
            let pid = args.pid(usage)?;
            Ok(Command::Reply {
                pid,
                text: args.rest().to_string(),
            })
        },
    },
    CommandSpec {
        letter: "N",
        name: "newsem",
        usage: "N <semaphore id> <initial value>",
        summary: "Create a semaphore",
        parse: |args, usage| {
            let id = args.int("semaphore id", usage)?;
            let value = args.int("initial value", usage)?;
            Ok(Command::NewSemaphore { id, value })
        },
    },
    CommandSpec {
        letter: "P",
        name: "p",
        usage: "P <semaphore id>",
        summary: "Semaphore wait",
        parse: |args, usage| {
            Ok(Command::SemaphoreP {
                id: args.int("semaphore id", usage)?,
            })
        },
    },
    CommandSpec {
        letter: "V",
        name: "v",
        usage: "V <semaphore id>",
        summary: "Semaphore signal",
        parse: |args, usage| {
            Ok(Command::SemaphoreV {
                id: args.int("semaphore id", usage)?,
            })
        },
    },
    CommandSpec {
        letter: "I",
        name: "info",
        usage: "I <pid>",
        summary: "Show one process",
        parse: |args, usage| {
            Ok(Command::Info {
                pid: args.pid(usage)?,
            })
        },
    },
    CommandSpec {
        letter: "T",
        name: "totalinfo",
        usage: "T",
        summary: "Show every queue and semaphore",
        parse: |_, _| Ok(Command::TotalInfo),
    },
    CommandSpec {
        letter: "H",
        name: "help",
        usage: "H",
        summary: "List commands",
        parse: |_, _| Ok(Command::Help),
    },
];

/// Look a command word up in [`COMMANDS`].
pub fn lookup(word: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.matches(word))
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut args = Args::new(line);
    let Some(word) = args.next_field() else {
        return Ok(None);
    };
    let spec = lookup(word).ok_or_else(|| CommandError::UnknownCommand(word.to_string()))?;
    (spec.parse)(&mut args, spec.usage).map(Some)
}

// ---------------------------------------------------------------------------
// Tokenizing
// ---------------------------------------------------------------------------

fn is_delimiter(c: char) -> bool {
    c == ',' || c.is_whitespace()
}

/// Cursor over the fields of a command line.
#[derive(Debug, Clone)]
pub struct Args<'a> {
    rest: &'a str,
}

impl<'a> Args<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// The next field, skipping any leading delimiters.
    pub fn next_field(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start_matches(is_delimiter);
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed.find(is_delimiter).unwrap_or(trimmed.len());
        let (field, rest) = trimmed.split_at(end);
        // Consume exactly one delimiter after the field.
        let mut chars = rest.chars();
        chars.next();
        self.rest = chars.as_str();
        Some(field)
    }

    /// Everything left on the line, minus leading delimiters and trailing
    /// whitespace.
    pub fn rest(&mut self) -> &'a str {
        let rest = self.rest.trim_start_matches(is_delimiter).trim_end();
        self.rest = "";
        rest
    }

    fn int(&mut self, argument: &'static str, usage: &'static str) -> Result<i64, CommandError> {
        let field = self
            .next_field()
            .ok_or(CommandError::MissingArgument { argument, usage })?;
        parse_int(field).ok_or_else(|| CommandError::InvalidArgument {
            argument,
            value: field.to_string(),
        })
    }

    fn pid(&mut self, usage: &'static str) -> Result<ProcessId, CommandError> {
        let field = self.next_field().ok_or(CommandError::MissingArgument {
            argument: "process id",
            usage,
        })?;
        parse_int(field)
            .and_then(|n| u32::try_from(n).ok())
            .map(ProcessId::new)
            .ok_or_else(|| CommandError::InvalidArgument {
                argument: "process id",
                value: field.to_string(),
            })
    }
}

/// Parse an integer literal the way C's `strtol` does with base 0.
///
/// Accepts an optional sign followed by decimal, `0x`/`0X` hexadecimal, or
/// leading-`0` octal digits. The whole field must be consumed.
pub fn parse_int(s: &str) -> Option<i64> {
    let (negative, body) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        (16, hex)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..])
    } else {
        (10, body)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
