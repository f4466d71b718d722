//! Backend-independent provisioning flow shared by every provider.

use anyhow::Result;
use kindle_common::ClusterConfig;

use crate::application::ports::{ImagePuller, NodeLauncher, ProgressReporter};
use crate::application::services::images::ensure_node_images;
use crate::application::services::planner::{
    DEFAULT_FIXUPS, ExecutionPolicy, PostCreateFixup, plan_creation, run_tasks,
};
use crate::application::services::retry::LinearBackoff;

/// Per-backend knobs of the provisioning flow.
#[derive(Debug, Clone, Copy)]
pub struct ProvisionOptions {
    pub pull_backoff: LinearBackoff,
    pub policy: ExecutionPolicy,
    pub fixups: &'static [PostCreateFixup],
}

impl ProvisionOptions {
    #[must_use]
    pub fn new(policy: ExecutionPolicy, pull_backoff: LinearBackoff) -> Self {
        Self {
            pull_backoff,
            policy,
            fixups: DEFAULT_FIXUPS,
        }
    }
}

/// Ensure images, plan one task per node, and run the tasks under the
/// backend's policy.
pub async fn provision_nodes<B>(
    backend: &B,
    reporter: &impl ProgressReporter,
    cluster: &str,
    config: &ClusterConfig,
    options: &ProvisionOptions,
) -> Result<()>
where
    B: NodeLauncher + ImagePuller,
{
    ensure_node_images(backend, reporter, config, &options.pull_backoff).await;

    reporter.start(&format!("Preparing nodes ({})", config.nodes.len()));
    let result = match plan_creation(backend, cluster, config, options.fixups) {
        Ok(tasks) => run_tasks(tasks, options.policy).await,
        Err(e) => Err(e.into()),
    };
    reporter.end(result.is_ok());
    result
}
