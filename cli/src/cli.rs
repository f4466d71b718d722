//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};
use kindle_common::ProviderKind;

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;
use crate::infra::config::YamlSettingsStore;

/// Run local Kubernetes clusters in ignite micro-VMs or docker containers
#[derive(Parser, Debug)]
#[command(
    name = "kindle",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Node backend (defaults to the settings file, then docker)
    #[arg(long, global = true, env = "KINDLE_PROVIDER", value_enum)]
    pub provider: Option<ProviderKind>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (also honours `NO_COLOR`)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log backend commands to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a cluster
    #[command(subcommand)]
    Create(commands::create::CreateCommand),

    /// Delete a cluster
    #[command(subcommand)]
    Delete(commands::delete::DeleteCommand),

    /// Query clusters, nodes and endpoints
    #[command(subcommand)]
    Get(commands::get::GetCommand),

    /// Install add-ons into a running cluster
    #[command(subcommand)]
    Install(commands::install::InstallCommand),
}

/// Call a generic command handler with the backend selected in `$app`.
macro_rules! with_provider {
    ($app:expr, |$provider:ident| $body:expr) => {
        match $app.provider {
            ProviderKind::Ignite => {
                let $provider = &$app.ignite();
                $body
            }
            ProviderKind::Docker => {
                let $provider = &$app.docker();
                $body
            }
        }
    };
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be loaded or the command fails.
    pub async fn run(self) -> Result<()> {
        let flags = AppFlags {
            output: OutputFlags {
                no_color: self.no_color,
                quiet: self.quiet,
                json: self.json,
            },
            provider: self.provider,
        };
        let app = AppContext::new(&flags, &YamlSettingsStore::default())?;
        match self.command {
            Command::Create(cmd) => {
                with_provider!(app, |provider| commands::create::run(&app, provider, cmd).await)
            }
            Command::Delete(cmd) => {
                with_provider!(app, |provider| commands::delete::run(&app, provider, cmd).await)
            }
            Command::Get(cmd) => {
                with_provider!(app, |provider| commands::get::run(&app, provider, cmd).await)
            }
            Command::Install(cmd) => {
                with_provider!(app, |provider| commands::install::run(&app, provider, cmd).await)
            }
        }
    }
}
