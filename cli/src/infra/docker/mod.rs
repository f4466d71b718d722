//! docker container backend. Nodes are created concurrently.

mod node;

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result};
use kindle_common::labels::{CLUSTER_LABEL_KEY, cluster_label, role_label};
use kindle_common::ClusterConfig;

pub use node::{DockerNode, DockerTransport};

use crate::application::command::{Invocation, output_lines};
use crate::application::ports::{
    CommandRunner, ImagePuller, LaunchRequest, Node, NodeLauncher, ProgressReporter, Provider,
};
use crate::application::services::nodes::resolve_api_server_endpoint;
use crate::application::services::planner::ExecutionPolicy;
use crate::application::services::provision::{ProvisionOptions, provision_nodes};
use crate::application::services::retry::{LinearBackoff, poll_until};
use crate::application::services::storage::ReadinessWait;
use crate::domain::readiness::system_booted;
use crate::infra::backend::{as_strs, invoke};

/// How long a freshly started container may take to finish booting systemd.
pub const DEFAULT_BOOT_WAIT: ReadinessWait = ReadinessWait {
    timeout: Duration::from_secs(120),
    interval: Duration::from_millis(500),
};

/// Provider for clusters of privileged docker containers.
pub struct DockerProvider<R> {
    transport: DockerTransport<R>,
    options: ProvisionOptions,
    boot_wait: ReadinessWait,
}

impl<R: CommandRunner> DockerProvider<R> {
    pub fn new(runner: R, binary: &str, pull_backoff: LinearBackoff) -> Self {
        Self {
            transport: DockerTransport::new(runner, binary),
            options: ProvisionOptions::new(ExecutionPolicy::Concurrent, pull_backoff),
            boot_wait: DEFAULT_BOOT_WAIT,
        }
    }

    /// Override how long `launch` waits for a container to boot.
    #[must_use]
    pub fn with_boot_wait(mut self, wait: ReadinessWait) -> Self {
        self.boot_wait = wait;
        self
    }

    #[must_use]
    pub fn options(&self) -> &ProvisionOptions {
        &self.options
    }

    /// Poll systemd in `name` until boot has finished or the wait runs out.
    async fn wait_for_boot(&self, name: &str) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.boot_wait.timeout;
        let booted = poll_until(deadline, self.boot_wait.interval, || self.boot_report(name)).await;
        if !booted {
            anyhow::bail!(
                "node {name} did not finish booting within {}s",
                self.boot_wait.timeout.as_secs()
            );
        }
        tracing::debug!(node = %name, "node booted");
        Ok(())
    }

    /// The exit status is ignored: `is-system-running` exits non-zero while
    /// the system is still starting, and `exec` fails until the container is up.
    async fn boot_report(&self, name: &str) -> bool {
        let invocation = Invocation::new("systemctl", &["is-system-running"]);
        let args = DockerTransport::<R>::exec_args(name, &invocation, false);
        match self.transport.runner().run(self.transport.binary(), &as_strs(&args)).await {
            Ok(output) => system_booted(&String::from_utf8_lossy(&output.stdout)),
            Err(e) => {
                tracing::debug!(node = %name, error = %e, "boot status unavailable");
                false
            }
        }
    }

    fn node(&self, name: &str) -> DockerNode<R> {
        DockerNode::new(name.to_string(), self.transport.clone())
    }

    async fn docker(&self, args: &[&str]) -> Result<Vec<String>> {
        let output = invoke(self.transport.runner(), self.transport.binary(), args).await?;
        Ok(output_lines(&output))
    }
}

/// `docker run` arguments for one node.
///
/// Disk size and kernel image only apply to micro-VMs and are ignored here.
#[must_use]
pub fn run_args(request: &LaunchRequest<'_>) -> Vec<String> {
    let spec = request.spec;
    let mut args: Vec<String> = [
        "run",
        "--detach",
        "--tty",
        "--privileged",
        "--security-opt",
        "seccomp=unconfined",
        "--security-opt",
        "apparmor=unconfined",
        "--tmpfs",
        "/tmp",
        "--tmpfs",
        "/run",
        "--volume",
        "/var",
        "--volume",
        "/lib/modules:/lib/modules:ro",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    args.extend([
        "--hostname".to_string(),
        request.name.to_string(),
        "--name".to_string(),
        request.name.to_string(),
        "--label".to_string(),
        cluster_label(request.cluster),
        "--label".to_string(),
        role_label(&spec.role),
        "--cpus".to_string(),
        spec.cpus.to_string(),
        "--memory".to_string(),
        spec.memory.clone(),
    ]);
    for mapping in &spec.extra_port_mappings {
        args.push("--publish".to_string());
        args.push(mapping.to_publish_arg());
    }
    args.push(spec.image.clone());
    args
}

impl<R: CommandRunner> NodeLauncher for DockerProvider<R> {
    type Transport = DockerTransport<R>;

    async fn launch(&self, request: &LaunchRequest<'_>) -> Result<()> {
        if request.spec.kernel_image.is_some() {
            tracing::debug!(node = %request.name, "ignoring kernel image for container node");
        }
        let args = run_args(request);
        invoke(self.transport.runner(), self.transport.binary(), &as_strs(&args))
            .await
            .context("docker run error")?;
        self.wait_for_boot(request.name).await
    }

    fn transport(&self) -> &Self::Transport {
        &self.transport
    }
}

impl<R: CommandRunner> ImagePuller for DockerProvider<R> {
    async fn pull_image(&self, image: &str) -> Result<()> {
        if self.docker(&["inspect", "--type=image", image]).await.is_ok() {
            tracing::debug!(image = %image, "image present locally");
            return Ok(());
        }
        tracing::debug!(image = %image, "pulling image");
        self.docker(&["pull", image])
            .await
            .with_context(|| format!("failed to pull image {image}"))?;
        Ok(())
    }
}

impl<R: CommandRunner> Provider for DockerProvider<R> {
    type Node = DockerNode<R>;

    async fn provision(
        &self,
        reporter: &impl ProgressReporter,
        cluster: &str,
        config: &ClusterConfig,
    ) -> Result<()> {
        provision_nodes(self, reporter, cluster, config, &self.options).await
    }

    async fn list_clusters(&self) -> Result<Vec<String>> {
        let filter = format!("label={CLUSTER_LABEL_KEY}");
        let format = format!("{{{{.Label \"{CLUSTER_LABEL_KEY}\"}}}}");
        let lines = self
            .docker(&["ps", "-a", "--filter", &filter, "--format", &format])
            .await
            .context("failed to list clusters")?;
        Ok(lines.into_iter().collect::<BTreeSet<_>>().into_iter().collect())
    }

    async fn list_nodes(&self, cluster: &str) -> Result<Vec<Self::Node>> {
        let filter = format!("label={}", cluster_label(cluster));
        let lines = self
            .docker(&["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"])
            .await
            .context("failed to list cluster nodes")?;
        Ok(lines.iter().map(|name| self.node(name)).collect())
    }

    async fn delete_nodes(&self, nodes: &[Self::Node]) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let mut args = vec!["rm", "-f", "-v"];
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
