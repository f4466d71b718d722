//! Post-provisioning storage install: apply the operator manifest, then wait
//! for the operator and its workload to become ready.
//!
//! Readiness timeouts are soft failures. The install reports them through
//! [`InstallOutcome`] and the status line, but the cluster stays usable.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::application::ports::{Node, ProgressReporter};
use crate::application::services::nodes::first_control_plane;
use crate::application::services::retry::poll_until;
use crate::domain::readiness::{CONDITION_READY, PHASE_RUNNING, all_tokens_match};

pub const STORAGE_MANIFEST_URL: &str = "https://gist.githubusercontent.com/darkowlzz/a32f1474151abd9a7f9a79ce563004c2/raw/ae42181afd4a28ac64ad4aa6df22fb27e51fdf9e/storageos-operator-deploy.yaml";
pub const ADMIN_KUBECONFIG: &str = "/etc/kubernetes/admin.conf";
pub const OPERATOR_NAMESPACE: &str = "storageos-operator";
pub const WORKLOAD_NAMESPACE: &str = "storageos";

const CONDITION_STATUS_JSONPATH: &str = "{.items..status.conditions[-1:].status}";
const PHASE_JSONPATH: &str = "{.items..status.phase}";

/// Deadline and interval used by both readiness waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessWait {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for ReadinessWait {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(500),
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Applying,
    WaitingOperatorReady,
    WaitingWorkloadReady,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Ready,
    OperatorTimedOut,
    WorkloadTimedOut,
}

/// Live cluster state handed to post-provisioning actions.
pub struct ActionContext<'a, N, R> {
    pub reporter: &'a R,
    pub nodes: &'a [N],
}

/// Installs the storage operator from a remote manifest.
#[derive(Debug, Clone)]
pub struct StorageInstall {
    pub manifest_url: String,
    pub kubeconfig: String,
    pub operator_namespace: String,
    pub workload_namespace: String,
    pub wait: ReadinessWait,
}

impl Default for StorageInstall {
    fn default() -> Self {
        Self {
            manifest_url: STORAGE_MANIFEST_URL.to_string(),
            kubeconfig: ADMIN_KUBECONFIG.to_string(),
            operator_namespace: OPERATOR_NAMESPACE.to_string(),
            workload_namespace: WORKLOAD_NAMESPACE.to_string(),
            wait: ReadinessWait::default(),
        }
    }
}

impl StorageInstall {
    #[must_use]
    pub fn with_wait(wait: ReadinessWait) -> Self {
        Self {
            wait,
            ..Self::default()
        }
    }

    /// Run the install against the first control-plane node of `ctx`.
    ///
    /// Hard failures (no control-plane, unreadable roles, failed apply) are
    /// errors. Readiness timeouts return `Ok` with a timed-out outcome.
    pub async fn execute<N: Node, R: ProgressReporter>(
        &self,
        ctx: &ActionContext<'_, N, R>,
    ) -> Result<InstallOutcome> {
        ctx.reporter.start("Starting storage");
        let result = self.drive(ctx).await;
        ctx.reporter
            .end(matches!(result, Ok(InstallOutcome::Ready)));
        result
    }

    async fn drive<N: Node, R: ProgressReporter>(
        &self,
        ctx: &ActionContext<'_, N, R>,
    ) -> Result<InstallOutcome> {
        let node = first_control_plane(ctx.nodes).await?;
        let mut phase = InstallPhase::Applying;
        loop {
            debug!(phase = ?phase, node = node.name(), "storage install");
            phase = match phase {
                InstallPhase::Applying => {
                    self.apply(node).await?;
                    InstallPhase::WaitingOperatorReady
                }
                InstallPhase::WaitingOperatorReady => {
                    ctx.reporter.step(&format!(
                        "Waiting ≤ {}s for the storage operator to be ready",
                        self.wait.timeout.as_secs()
                    ));
                    let ready = self
                        .wait_for(node, &self.operator_namespace, CONDITION_STATUS_JSONPATH, CONDITION_READY)
                        .await;
                    if !ready {
                        warn!(namespace = %self.operator_namespace, "timed out waiting for storage operator");
                        ctx.reporter
                            .warn("Timed out waiting for the storage operator to be ready");
                        return Ok(InstallOutcome::OperatorTimedOut);
                    }
                    ctx.reporter.success("Storage operator ready");
                    InstallPhase::WaitingWorkloadReady
                }
                InstallPhase::WaitingWorkloadReady => {
                    ctx.reporter.step(&format!(
                        "Waiting ≤ {}s for storage to be ready",
                        self.wait.timeout.as_secs()
                    ));
                    let ready = self
                        .wait_for(node, &self.workload_namespace, PHASE_JSONPATH, PHASE_RUNNING)
                        .await;
                    if !ready {
                        warn!(namespace = %self.workload_namespace, "timed out waiting for storage pods");
                        ctx.reporter.warn("Timed out waiting for storage to be ready");
                        return Ok(InstallOutcome::WorkloadTimedOut);
                    }
                    ctx.reporter.success("Storage ready");
                    InstallPhase::Done
                }
                InstallPhase::Done => return Ok(InstallOutcome::Ready),
            };
        }
    }

    async fn apply<N: Node>(&self, node: &N) -> Result<()> {
        node.command(
            "kubectl",
            &[
                "apply",
                "-f",
                &self.manifest_url,
                &format!("--kubeconfig={}", self.kubeconfig),
            ],
        )
        .run()
        .await
        .context("failed to set up storage")?;
        Ok(())
    }

    async fn wait_for<N: Node>(&self, node: &N, namespace: &str, jsonpath: &str, marker: &str) -> bool {
        let deadline = Instant::now() + self.wait.timeout;
        poll_until(deadline, self.wait.interval, || {
            self.pods_report(node, namespace, jsonpath, marker)
        })
        .await
    }

    async fn pods_report<N: Node>(&self, node: &N, namespace: &str, jsonpath: &str, marker: &str) -> bool {
        let result = node
            .command(
                "kubectl",
                &[
                    &format!("--kubeconfig={}", self.kubeconfig),
                    "-n",
                    namespace,
                    "get",
                    "pods",
                    &format!("-o=jsonpath={jsonpath}"),
                ],
            )
            .run()
            .await;
        match result {
            Ok(output) => all_tokens_match(&String::from_utf8_lossy(&output.stdout), marker),
            Err(e) => {
                debug!(node = node.name(), namespace = %namespace, error = %e, "pod status query failed");
                false
            }
        }
    }
}

/// Post-provisioning steps, run in a fixed order.
#[derive(Debug, Clone)]
pub enum ClusterAction {
    InstallStorage(StorageInstall),
}

/// Run `actions` in order, stopping at the first hard failure.
pub async fn run_actions<N: Node, R: ProgressReporter>(
    ctx: &ActionContext<'_, N, R>,
    actions: &[ClusterAction],
) -> Result<()> {
    for action in actions {
        match action {
            ClusterAction::InstallStorage(install) => {
                install.execute(ctx).await?;
            }
        }
    }
    Ok(())
}
