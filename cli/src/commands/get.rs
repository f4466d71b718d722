//! `kindle get` — query clusters, nodes and endpoints.

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::{Node, Provider};
use crate::commands::ClusterNameArgs;
use crate::output::json;

#[derive(Subcommand, Debug)]
pub enum GetCommand {
    /// List clusters
    Clusters,
    /// List the nodes of a cluster
    Nodes(ClusterNameArgs),
    /// Print the API server endpoint of a cluster
    Endpoint(ClusterNameArgs),
}

/// Run `kindle get ...`.
///
/// # Errors
///
/// Returns an error if the backend query fails.
pub async fn run(app: &AppContext, provider: &impl Provider, cmd: GetCommand) -> Result<()> {
    match cmd {
        GetCommand::Clusters => {
            let clusters = provider.list_clusters().await?;
            print_list(app, &clusters, "No kind clusters found.")
        }
        GetCommand::Nodes(args) => {
            let nodes = provider.list_nodes(&args.name).await?;
            let names: Vec<String> = nodes.iter().map(|n| n.name().to_string()).collect();
            print_list(
                app,
                &names,
                &format!("No kind nodes found for cluster \"{}\".", args.name),
            )
        }
        GetCommand::Endpoint(args) => {
            let endpoint = provider.api_server_endpoint(&args.name).await?;
            if app.is_json() {
                let doc = serde_json::json!({ "cluster": args.name, "endpoint": endpoint });
                app.output.data(&json::to_document(&doc)?);
            } else {
                app.output.data(&endpoint);
            }
            Ok(())
        }
    }
}

fn print_list(app: &AppContext, items: &[String], empty: &str) -> Result<()> {
    if app.is_json() {
        app.output.data(&json::to_document(items)?);
    } else if items.is_empty() {
        app.output.info(empty);
    } else {
        for item in items {
            app.output.data(item);
        }
    }
    Ok(())
}
