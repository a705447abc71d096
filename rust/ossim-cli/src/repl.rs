//! Interactive line editor over a [`Session`].

use std::fs;
use std::path::{Path, PathBuf};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use crate::command::COMMANDS;
use crate::render::{OutputFormat, PROMPT, PROMPT_BANNER};
use crate::session::Session;

/// Environment variable used to override the history file location.
const HISTORY_PATH_ENV: &str = "OSSIM_HISTORY_PATH";

/// Completes command names at the start of the line.
struct CommandCompleter;

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        let start = head.len() - head.trim_start().len();
        let word = &head[start..];
        // Only the command word is completed.
        if word.is_empty() || word.contains(|c: char| c == ',' || c.is_whitespace()) {
            return Ok((start, Vec::new()));
        }
        let lower = word.to_ascii_lowercase();
        let candidates = COMMANDS
            .iter()
            .filter(|spec| spec.name.starts_with(&lower))
            .map(|spec| Pair {
                display: format!("{} ({})", spec.name, spec.letter),
                replacement: spec.name.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}

impl Validator for CommandCompleter {}

impl Helper for CommandCompleter {}

/// Run the interactive loop until shutdown, Ctrl-D, or an editor error.
pub fn run_repl(session: &mut Session) -> Result<(), ReadlineError> {
    let palette = session.renderer().palette();
    let config = rustyline::Config::builder().auto_add_history(true).build();
    let mut rl: Editor<CommandCompleter, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(CommandCompleter));

    let history_path = history_path();
    if let Some(ref path) = history_path {
        if path.exists() {
            if let Err(err) = rl.load_history(path) {
                eprintln!(
                    "{} failed to load history from {}: {}",
                    palette.red("Warning:"),
                    path.display(),
                    err
                );
            }
        }
    }

    let text_mode = session.renderer().format() == OutputFormat::Text;
    while !session.is_halted() {
        if text_mode {
            println!("{}", palette.bold(PROMPT_BANNER));
        }
        match rl.readline(PROMPT) {
            Ok(line) => print!("{}", session.handle_line(&line)),
            Err(ReadlineError::Interrupted) => {
                println!("{}", palette.gray("(Ctrl-D to exit)"));
            }
            Err(ReadlineError::Eof) => {
                if let Some(farewell) = session.renderer().farewell() {
                    print!("\n{}", farewell);
                }
                break;
            }
            Err(err) => return Err(err),
        }
    }

    if let Some(ref path) = history_path {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(err) = rl.save_history(path) {
            eprintln!(
                "{} failed to save history to {}: {}",
                palette.red("Warning:"),
                path.display(),
                err
            );
        }
    }
    Ok(())
}

/// Resolve the history file: an absolute override is used as-is, a
/// relative one is taken from `home`; otherwise `~/.ossim/history`.
fn resolve_history_path(home: Option<&Path>, override_path: Option<&str>) -> Option<PathBuf> {
    match override_path.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => {
            let configured = PathBuf::from(raw.strip_prefix("~/").unwrap_or(raw));
            if configured.is_absolute() {
                Some(configured)
            } else {
                Some(home?.join(configured))
            }
        }
        None => Some(home?.join(".ossim").join("history")),
    }
}

fn history_path() -> Option<PathBuf> {
    let override_path = std::env::var(HISTORY_PATH_ENV).ok();
    resolve_history_path(dirs::home_dir().as_deref(), override_path.as_deref())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
