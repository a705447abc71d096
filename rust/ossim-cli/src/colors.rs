//! ANSI color helpers for CLI output.
//!
//! Coloring goes through a [`Palette`] so it can be switched off for
//! `--no-color`, `NO_COLOR`, and JSON output.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// A palette that emits plain text.
    pub fn plain() -> Self {
        Self::new(false)
    }

    /// Colors on unless `NO_COLOR` is set to a non-empty value.
    pub fn from_env() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::new(!no_color)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, s)
        } else {
            s.to_string()
        }
    }

    /// Successes.
    pub fn green(&self, s: &str) -> String {
        self.paint("32", s)
    }

    /// Errors.
    pub fn red(&self, s: &str) -> String {
        self.paint("31", s)
    }

    /// OS notices.
    pub fn cyan(&self, s: &str) -> String {
        self.paint("36", s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.paint("1", s)
    }

    pub fn gray(&self, s: &str) -> String {
        self.paint("90", s)
    }

    /// Format a status label (right-aligned, green, bold).
    pub fn status_label(&self, label: &str) -> String {
        self.paint("1;32", &format!("{:>12}", label))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
