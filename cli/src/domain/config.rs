//! Domain types for kindle settings.
//!
//! Pure data only. No I/O, no async, no filesystem access.

use std::time::Duration;

use kindle_common::ProviderKind;
use serde::{Deserialize, Serialize};

// ── Settings schema ──────────────────────────────────────────────────────────

/// Top-level settings stored in `~/.kindle/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct KindleSettings {
    /// Backend used when `--provider` is not given.
    pub provider: ProviderKind,
    pub binaries: BinarySettings,
    pub images: ImageSettings,
    pub readiness: ReadinessSettings,
    pub commands: CommandSettings,
}

/// Paths of the backend executables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BinarySettings {
    pub ignite: String,
    pub docker: String,
}

impl Default for BinarySettings {
    fn default() -> Self {
        Self {
            ignite: "ignite".to_string(),
            docker: "docker".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImageSettings {
    /// Extra pull attempts after the first one fails.
    pub pull_retries: u32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self { pull_retries: 4 }
    }
}

/// Deadline and poll interval shared by every readiness wait.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReadinessSettings {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 500,
            poll_interval_ms: 2_000,
        }
    }
}

impl ReadinessSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandSettings {
    /// Upper bound for a single backend process.
    pub timeout_secs: u64,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self { timeout_secs: 600 }
    }
}

impl CommandSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
