//! `kindle create cluster` — provision a new cluster.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use kindle_common::ClusterConfig;

use crate::app::AppContext;
use crate::application::ports::Provider;
use crate::application::services::cluster::{CreateOptions, create_cluster};
use crate::application::services::storage::ClusterAction;
use crate::commands::DEFAULT_CLUSTER_NAME;
use crate::infra::config::load_cluster_config;
use crate::output::{TerminalReporter, json};

#[derive(Subcommand, Debug)]
pub enum CreateCommand {
    /// Create a local Kubernetes cluster
    Cluster(CreateClusterArgs),
}

#[derive(Args, Debug)]
pub struct CreateClusterArgs {
    /// Cluster name (overrides the name in the config file)
    #[arg(long)]
    pub name: Option<String>,

    /// Path to a cluster config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Keep the nodes when creation fails, for debugging
    #[arg(long)]
    pub retain: bool,

    /// Install the storage operator once the nodes are up
    #[arg(long)]
    pub install_storage: bool,
}

/// Pick the cluster name: flag, then config file, then the default.
#[must_use]
pub fn resolve_name(flag: Option<&str>, config: &ClusterConfig) -> String {
    flag.or(config.name.as_deref())
        .unwrap_or(DEFAULT_CLUSTER_NAME)
        .to_string()
}

/// Run `kindle create cluster`.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or provisioning fails.
pub async fn run(app: &AppContext, provider: &impl Provider, cmd: CreateCommand) -> Result<()> {
    let CreateCommand::Cluster(args) = cmd;
    let config = match &args.config {
        Some(path) => load_cluster_config(path)?,
        None => ClusterConfig::default(),
    };
    let name = resolve_name(args.name.as_deref(), &config);

    let mut options = CreateOptions {
        retain: args.retain,
        actions: Vec::new(),
    };
    if args.install_storage {
        options
            .actions
            .push(ClusterAction::InstallStorage(app.storage_install()));
    }

    app.output
        .info(&format!("Creating cluster \"{name}\" with {} ...", app.provider));
    let reporter = TerminalReporter::new(&app.output);
    create_cluster(provider, &reporter, &name, &config, &options).await?;

    if app.is_json() {
        let doc = serde_json::json!({ "cluster": name, "nodes": config.nodes.len() });
        app.output.data(&json::to_document(&doc)?);
    } else {
        app.output.success(&format!("Cluster \"{name}\" is ready"));
        app.output
            .info(&format!("API server: kindle get endpoint --name {name}"));
    }
    Ok(())
}
