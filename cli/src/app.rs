//! Application context — unified state passed to every command handler.
//!
//! `AppContext` owns the output context and the loaded settings, and builds
//! the backend selected by `--provider` (or the settings default).

use std::time::Duration;

use anyhow::Result;
use kindle_common::ProviderKind;

use crate::application::ports::SettingsStore;
use crate::application::services::retry::LinearBackoff;
use crate::application::services::storage::{ReadinessWait, StorageInstall};
use crate::domain::config::KindleSettings;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::docker::DockerProvider;
use crate::infra::ignite::IgniteProvider;
use crate::output::OutputContext;

/// Unit of the linear image-pull backoff.
const PULL_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Backend override; falls back to the settings file.
    pub provider: Option<ProviderKind>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Settings loaded from `~/.kindle/config.yaml`.
    pub settings: KindleSettings,
    /// Backend chosen for this invocation.
    pub provider: ProviderKind,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be read.
    pub fn new(flags: &AppFlags, store: &impl SettingsStore) -> Result<Self> {
        let settings = store.load()?;
        let provider = flags.provider.unwrap_or(settings.provider);
        tracing::debug!(provider = %provider, "selected provider");
        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet, flags.output.json),
            settings,
            provider,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.output.json
    }

    fn runner(&self) -> TokioCommandRunner {
        TokioCommandRunner::new(self.settings.commands.timeout())
    }

    fn pull_backoff(&self) -> LinearBackoff {
        LinearBackoff::new(self.settings.images.pull_retries, PULL_BACKOFF_UNIT)
    }

    #[must_use]
    pub fn ignite(&self) -> IgniteProvider<TokioCommandRunner> {
        IgniteProvider::new(self.runner(), &self.settings.binaries.ignite, self.pull_backoff())
    }

    #[must_use]
    pub fn docker(&self) -> DockerProvider<TokioCommandRunner> {
        DockerProvider::new(self.runner(), &self.settings.binaries.docker, self.pull_backoff())
    }

    /// Storage install using the configured readiness deadline.
    #[must_use]
    pub fn storage_install(&self) -> StorageInstall {
        StorageInstall::with_wait(ReadinessWait {
            timeout: self.settings.readiness.timeout(),
            interval: self.settings.readiness.poll_interval(),
        })
    }
}
