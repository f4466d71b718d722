//! `kindle delete cluster` — remove every node of a cluster.

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::Provider;
use crate::application::services::cluster::delete_cluster;
use crate::commands::ClusterNameArgs;
use crate::output::json;

#[derive(Subcommand, Debug)]
pub enum DeleteCommand {
    /// Delete a cluster
    Cluster(ClusterNameArgs),
}

/// Run `kindle delete cluster`.
///
/// Deleting a cluster that has no nodes succeeds.
///
/// # Errors
///
/// Returns an error if the nodes cannot be listed or removed.
pub async fn run(app: &AppContext, provider: &impl Provider, cmd: DeleteCommand) -> Result<()> {
    let DeleteCommand::Cluster(args) = cmd;
    app.output
        .info(&format!("Deleting cluster \"{}\" ...", args.name));
    let deleted = delete_cluster(provider, &args.name).await?;

    if app.is_json() {
        let doc = serde_json::json!({ "cluster": args.name, "deletedNodes": deleted });
        app.output.data(&json::to_document(&doc)?);
    } else if deleted == 0 {
        app.output
            .warn(&format!("No nodes found for cluster \"{}\"", args.name));
    } else {
        app.output.success(&format!("Deleted {deleted} node(s)"));
    }
    Ok(())
}
