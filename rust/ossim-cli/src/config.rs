//! Configuration file parsing for `ossim.toml`.
//!
//! Searches current directory then ancestors, falling back to
//! `~/.config/ossim/ossim.toml` if no project-level file is found.

use ossim_runtime::{ConfigError, KernelConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the project-level config file.
pub const CONFIG_FILE: &str = "ossim.toml";

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
pub struct OssimConfig {
    #[serde(default)]
    pub kernel: KernelConfig,
}

impl OssimConfig {
    /// Resolve the configuration for a run.
    ///
    /// An explicit path wins; otherwise the usual search applies and the
    /// defaults are used when nothing is found. Returns the file that was
    /// used, if any.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Option<PathBuf>, Self), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Some(path.to_path_buf()), Self::load_from(path)?));
        }
        let start = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: ".".to_string(),
            source,
        })?;
        let home = dirs::home_dir();
        match Self::find(&start, home.as_deref()) {
            Some(path) => {
                let cfg = Self::load_from(&path)?;
                Ok((Some(path), cfg))
            }
            None => Ok((None, Self::default())),
        }
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str(&content)
    }

    /// Parse and validate a TOML string.
    pub fn parse_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.kernel.validate()?;
        Ok(cfg)
    }

    /// Locate a config file: `start` and its ancestors, then the global one.
    fn find(start: &Path, home: Option<&Path>) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                break;
            }
        }
        let global = home?.join(".config").join("ossim").join(CONFIG_FILE);
        global.is_file().then_some(global)
    }

    /// Generate a default `ossim.toml` template.
    pub fn default_template() -> &'static str {
        r#"# OSSIM Configuration

[kernel]
# Number of ready queues. Level 0 is the highest priority. (1-8)
priority_levels = 3

# Number of semaphores, ids 0 .. semaphore_count - 1. (1-64)
semaphore_count = 5

# CPU bursts at one priority level before a process is promoted or demoted.
aging_threshold = 5

# Longer message text is truncated to this many characters.
max_message_len = 40
"#
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
