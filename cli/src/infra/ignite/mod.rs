//! ignite micro-VM backend. VMs are created one at a time.

mod node;

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use kindle_common::labels::{CLUSTER_LABEL_KEY, cluster_label, role_label};
use kindle_common::{ClusterConfig, PortMapping};

pub use node::{IgniteNode, IgniteTransport};

use crate::application::command::output_lines;
use crate::application::ports::{
    CommandRunner, ImagePuller, LaunchRequest, Node, NodeLauncher, ProgressReporter, Provider,
};
use crate::application::services::nodes::resolve_api_server_endpoint;
use crate::application::services::planner::ExecutionPolicy;
use crate::application::services::provision::{ProvisionOptions, provision_nodes};
use crate::application::services::retry::LinearBackoff;
use crate::infra::backend::{as_strs, invoke};
use node::RUNTIME_ARGS;

pub const DEFAULT_KERNEL_IMAGE: &str = "darkowlzz/ignite-kernel:5.3";

/// Provider for clusters of ignite VMs.
///
/// Generic over `R: CommandRunner` so that tests can inject a mock runner
/// without spawning real processes.
pub struct IgniteProvider<R> {
    transport: IgniteTransport<R>,
    options: ProvisionOptions,
}

impl<R: CommandRunner> IgniteProvider<R> {
    pub fn new(runner: R, binary: &str, pull_backoff: LinearBackoff) -> Self {
        Self {
            transport: IgniteTransport::new(runner, binary),
            options: ProvisionOptions::new(ExecutionPolicy::Sequential, pull_backoff),
        }
    }

    #[must_use]
    pub fn options(&self) -> &ProvisionOptions {
        &self.options
    }

    fn node(&self, name: &str) -> IgniteNode<R> {
        IgniteNode::new(name.to_string(), self.transport.clone())
    }

    async fn ps(&self, filter: &str, format: &str) -> Result<Vec<String>> {
        let output = invoke(
            self.transport.runner(),
            self.transport.binary(),
            &["ps", "-a", "--filter", filter, "--format", format],
        )
        .await?;
        Ok(output_lines(&output))
    }
}

/// `ignite run` arguments for one node.
#[must_use]
pub fn run_args(request: &LaunchRequest<'_>) -> Vec<String> {
    let spec = request.spec;
    let mut args = vec![
        "run".to_string(),
        "--name".to_string(),
        request.name.to_string(),
        "--cpus".to_string(),
        spec.cpus.to_string(),
        "--memory".to_string(),
        spec.memory.clone(),
        "--kernel-image".to_string(),
        spec.kernel_image
            .clone()
            .unwrap_or_else(|| DEFAULT_KERNEL_IMAGE.to_string()),
        "--size".to_string(),
        spec.disk_size.clone(),
        "--ssh".to_string(),
        "--label".to_string(),
        role_label(&spec.role),
        "--label".to_string(),
        cluster_label(request.cluster),
    ];
    args.extend(RUNTIME_ARGS.iter().map(ToString::to_string));
    for mapping in &spec.extra_port_mappings {
        args.push("--ports".to_string());
        args.push(port_arg(mapping));
    }
    args.push(spec.image.clone());
    args
}

/// ignite wants an explicit host port, so a random one falls back to the
/// VM port.
fn port_arg(mapping: &PortMapping) -> String {
    let host_port = if mapping.host_port == 0 {
        mapping.container_port
    } else {
        mapping.host_port
    };
    let tail = format!("{host_port}:{}/{}", mapping.container_port, mapping.protocol);
    if mapping.listen_address.is_empty() {
        tail
    } else {
        format!("{}:{tail}", mapping.listen_address)
    }
}

impl<R: CommandRunner> NodeLauncher for IgniteProvider<R> {
    type Transport = IgniteTransport<R>;

    async fn launch(&self, request: &LaunchRequest<'_>) -> Result<()> {
        let args = run_args(request);
        invoke(self.transport.runner(), self.transport.binary(), &as_strs(&args))
            .await
            .context("ignite run error")?;
        Ok(())
    }

    fn transport(&self) -> &Self::Transport {
        &self.transport
    }
}

impl<R: CommandRunner> ImagePuller for IgniteProvider<R> {
    /// ignite cannot inspect its image store, so the import always runs.
    async fn pull_image(&self, image: &str) -> Result<()> {
        tracing::debug!(image = %image, "importing image");
        invoke(
            self.transport.runner(),
            self.transport.binary(),
            &["image", "import", image, RUNTIME_ARGS[0]],
        )
        .await
        .with_context(|| format!("failed to import image {image}"))?;
        Ok(())
    }
}

impl<R: CommandRunner> Provider for IgniteProvider<R> {
    type Node = IgniteNode<R>;

    async fn provision(
        &self,
        reporter: &impl ProgressReporter,
        cluster: &str,
        config: &ClusterConfig,
    ) -> Result<()> {
        provision_nodes(self, reporter, cluster, config, &self.options).await
    }

    async fn list_clusters(&self) -> Result<Vec<String>> {
        let filter = format!("{{{{.ObjectMeta.Labels}}}}=~{CLUSTER_LABEL_KEY}");
        let format = format!("{{{{index .ObjectMeta.Labels \"{CLUSTER_LABEL_KEY}\"}}}}");
        let lines = self
            .ps(&filter, &format)
            .await
            .context("failed to list clusters")?;
        Ok(lines.into_iter().collect::<BTreeSet<_>>().into_iter().collect())
    }

    async fn list_nodes(&self, cluster: &str) -> Result<Vec<Self::Node>> {
        // The label filter is a substring match, so the label value is
        // printed alongside the name and compared exactly.
        let filter = format!("{{{{.ObjectMeta.Labels}}}}=~{CLUSTER_LABEL_KEY}:{cluster}");
        let format =
            format!("{{{{.ObjectMeta.Name}}}} {{{{index .ObjectMeta.Labels \"{CLUSTER_LABEL_KEY}\"}}}}");
        let lines = self
            .ps(&filter, &format)
            .await
            .context("failed to list cluster nodes")?;
        Ok(lines
            .iter()
            .filter_map(|line| line.split_once(' '))
            .filter(|(_, label)| label.trim() == cluster)
            .map(|(name, _)| self.node(name.trim()))
            .collect())
    }

    async fn delete_nodes(&self, nodes: &[Self::Node]) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let mut args = vec!["rm", "-f"];
        args.extend(nodes.iter().map(|node| node.name()));
        invoke(self.transport.runner(), self.transport.binary(), &args)
            .await
            .context("failed to delete nodes")?;
        Ok(())
    }

    async fn api_server_endpoint(&self, cluster: &str) -> Result<String> {
        resolve_api_server_endpoint(self, cluster).await
    }
}
