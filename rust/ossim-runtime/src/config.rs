//! Kernel tuning knobs.
//!
//! The defaults reproduce the classic simulator: three priority levels, five
//! semaphores, promotion/demotion after five bursts, 40-character messages.

use serde::{Deserialize, Serialize};

/// Upper bound on `priority_levels`.
pub const MAX_PRIORITY_LEVELS: usize = 8;

/// Upper bound on `semaphore_count`.
pub const MAX_SEMAPHORES: usize = 64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
}

// ---------------------------------------------------------------------------
// KernelConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Number of ready queues (L). Level 0 is the highest priority.
    pub priority_levels: usize,
    /// Number of semaphore slots (N).
    pub semaphore_count: usize,
    /// Bursts at one level before the process moves.
    pub aging_threshold: u32,
    /// Longest message text, in characters. This bounds the stored text
    /// only; the command line around it is not counted.
    pub max_message_len: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            priority_levels: 3,
            semaphore_count: 5,
            aging_threshold: 5,
            max_message_len: 40,
        }
    }
}

impl KernelConfig {
    /// Parse a bare `KernelConfig` from TOML and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("priority_levels", self.priority_levels, 1, MAX_PRIORITY_LEVELS)?;
        check("semaphore_count", self.semaphore_count, 1, MAX_SEMAPHORES)?;
        check(
            "aging_threshold",
            self.aging_threshold as usize,
            1,
            u32::MAX as usize,
        )?;
        check("max_message_len", self.max_message_len, 1, usize::MAX)?;
        Ok(())
    }

    /// The lowest priority level, `L - 1`.
    pub fn lowest_priority(&self) -> usize {
        self.priority_levels.saturating_sub(1)
    }
}

fn check(field: &'static str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
