//! A kernel plus the renderer that reports on it.
//!
//! [`Session`] is the driver shared by the interactive REPL, `--script`
//! files and piped stdin: it takes one line at a time and hands back the
//! text to show for it.

use crate::command::{parse_command, Outcome};
use crate::render::Renderer;
use ossim_runtime::{ConfigError, Kernel, KernelConfig};
use std::io::{self, BufRead, Write};
use tracing::debug;

pub struct Session {
    kernel: Kernel,
    renderer: Renderer,
}

impl Session {
    /// Boot a kernel and return the session with the rendered boot events.
    pub fn boot(config: KernelConfig, renderer: Renderer) -> Result<(Self, String), ConfigError> {
        let (kernel, events) = Kernel::boot(config)?;
        let banner = renderer.events(&events);
        Ok((Self { kernel, renderer }, banner))
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// True once INIT has terminated and no further input is accepted.
    pub fn is_halted(&self) -> bool {
        self.kernel.is_halted()
    }

    /// Parse and run one line, returning its rendered output.
    ///
    /// Blank lines produce no output.
    pub fn handle_line(&mut self, line: &str) -> String {
        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return String::new(),
            Err(err) => {
                debug!(%err, "rejected input");
                return self.renderer.error(&err);
            }
        };
        debug!(?command, "executing");
        match command.execute(&mut self.kernel) {
            Ok(Outcome::Events(events)) => self.renderer.events(&events),
            Ok(Outcome::Info(info)) => self.renderer.info(&info),
            Ok(Outcome::Snapshot(snapshot)) => self.renderer.snapshot(&snapshot),
            Ok(Outcome::Help) => self.renderer.help(),
            Err(err) => {
                debug!(%err, "command failed");
                self.renderer.error(&err)
            }
        }
    }

    /// Feed every line of `input` through the kernel, writing to `out`.
    ///
    /// Stops at end of input or once the kernel shuts down.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        let mut lines = input.lines();
        while !self.is_halted() {
            write!(out, "{}", self.renderer.prompt())?;
            out.flush()?;
            let Some(line) = lines.next() else {
                if let Some(farewell) = self.renderer.farewell() {
                    write!(out, "\n{}", farewell)?;
                }
                break;
            };
            let line = line?;
            write!(out, "{}", self.handle_line(line.trim_end_matches('\r')))?;
        }
        out.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
