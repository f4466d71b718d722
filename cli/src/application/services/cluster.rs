//! Cluster-level use-cases composed from provider operations.

use anyhow::{Context, Result, bail};
use kindle_common::ClusterConfig;
use tracing::{info, warn};

use crate::application::ports::{ProgressReporter, Provider};
use crate::application::services::storage::{
    ActionContext, ClusterAction, InstallOutcome, StorageInstall, run_actions,
};

/// Options for [`create_cluster`].
#[derive(Debug, Default)]
pub struct CreateOptions {
    /// Keep nodes around when provisioning fails.
    pub retain: bool,
    pub actions: Vec<ClusterAction>,
}

/// Provision `name` from `config`, then run post-provisioning actions.
///
/// A failed provision deletes whatever nodes were created unless
/// `options.retain` is set.
pub async fn create_cluster<P, R>(
    provider: &P,
    reporter: &R,
    name: &str,
    config: &ClusterConfig,
    options: &CreateOptions,
) -> Result<()>
where
    P: Provider,
    R: ProgressReporter,
{
    config.validate().context("invalid cluster configuration")?;

    let existing = provider.list_clusters().await?;
    if existing.iter().any(|cluster| cluster == name) {
        bail!("node(s) already exist for a cluster with the name \"{name}\"");
    }

    info!(cluster = %name, nodes = config.nodes.len(), "provisioning cluster");
    if let Err(e) = provider.provision(reporter, name, config).await {
        if options.retain {
            warn!(cluster = %name, "provisioning failed, retaining nodes for debugging");
        } else if let Err(cleanup) = delete_cluster(provider, name).await {
            warn!(cluster = %name, error = %format!("{cleanup:#}"), "failed to clean up after provisioning failure");
        }
        return Err(e);
    }

    if !options.actions.is_empty() {
        let nodes = provider.list_nodes(name).await?;
        let ctx = ActionContext {
            reporter,
            nodes: &nodes,
        };
        run_actions(&ctx, &options.actions).await?;
    }
    Ok(())
}

/// Delete every node labelled as a member of `name`.
pub async fn delete_cluster<P: Provider>(provider: &P, name: &str) -> Result<usize> {
    let nodes = provider.list_nodes(name).await?;
    provider.delete_nodes(&nodes).await?;
    info!(cluster = %name, nodes = nodes.len(), "deleted cluster nodes");
    Ok(nodes.len())
}

/// Install storage into the existing cluster `name`.
///
/// # Errors
///
/// Fails when the cluster has no nodes or the install hits a hard failure.
pub async fn install_storage<P, R>(
    provider: &P,
    reporter: &R,
    name: &str,
    install: &StorageInstall,
) -> Result<InstallOutcome>
where
    P: Provider,
    R: ProgressReporter,
{
    let nodes = provider.list_nodes(name).await?;
    if nodes.is_empty() {
        bail!("unknown cluster \"{name}\"");
    }
    let ctx = ActionContext {
        reporter,
        nodes: &nodes,
    };
    install.execute(&ctx).await
}
