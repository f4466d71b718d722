//! `kindle install storage` — install the storage operator into a running
//! cluster.

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::Provider;
use crate::application::services::cluster::install_storage;
use crate::application::services::storage::InstallOutcome;
use crate::commands::ClusterNameArgs;
use crate::output::{TerminalReporter, json};

#[derive(Subcommand, Debug)]
pub enum InstallCommand {
    /// Install the storage operator
    Storage(ClusterNameArgs),
}

#[must_use]
pub fn outcome_label(outcome: InstallOutcome) -> &'static str {
    match outcome {
        InstallOutcome::Ready => "ready",
        InstallOutcome::OperatorTimedOut => "operator-timed-out",
        InstallOutcome::WorkloadTimedOut => "workload-timed-out",
    }
}

/// Run `kindle install storage`.
///
/// Readiness timeouts are reported but do not fail the command.
///
/// # Errors
///
/// Returns an error if the cluster has no nodes or the manifest cannot be
/// applied.
pub async fn run(app: &AppContext, provider: &impl Provider, cmd: InstallCommand) -> Result<()> {
    let InstallCommand::Storage(args) = cmd;
    let reporter = TerminalReporter::new(&app.output);
    let outcome = install_storage(provider, &reporter, &args.name, &app.storage_install()).await?;

    if app.is_json() {
        let doc = serde_json::json!({ "cluster": args.name, "storage": outcome_label(outcome) });
        app.output.data(&json::to_document(&doc)?);
    } else if outcome != InstallOutcome::Ready {
        app.output
            .warn("Storage was applied but is not ready yet; check it with kubectl");
    }
    Ok(())
}
