//! Creation planning: one task per declared node, run under a policy.

use std::future::Future;

use anyhow::{Context, Result};
use futures_util::future::{LocalBoxFuture, join_all};
use futures_util::FutureExt;
use kindle_common::types::API_SERVER_INTERNAL_PORT;
use kindle_common::{ClusterConfig, NodeRole, PortMapping, PortProtocol};

use crate::application::command::Invocation;
use crate::application::ports::{CommandTransport, LaunchRequest, NodeLauncher};
use crate::domain::PlanError;
use crate::domain::naming::NodeNamer;

/// Commands run inside every freshly launched node, in order.
///
/// Nodes cloned from one image share a hostname and machine ID until these
/// are reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostCreateFixup {
    Hostname,
    MachineId,
}

pub const DEFAULT_FIXUPS: &[PostCreateFixup] =
    &[PostCreateFixup::Hostname, PostCreateFixup::MachineId];

impl PostCreateFixup {
    #[must_use]
    pub fn invocation(self, node: &str) -> Invocation {
        match self {
            Self::Hostname => Invocation::new("hostnamectl", &["set-hostname", node]),
            Self::MachineId => Invocation::new(
                "sh",
                &["-c", "rm -f /etc/machine-id && systemd-machine-id-setup"],
            ),
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Self::Hostname => "failed to change hostname",
            Self::MachineId => "failed to change machine ID",
        }
    }

    /// Single attempt. A failure aborts only the owning node's task.
    pub async fn apply<T: CommandTransport>(self, transport: &T, node: &str) -> Result<()> {
        transport
            .exec(node, &self.invocation(node))
            .await
            .context(self.failure_message())?;
        Ok(())
    }
}

/// How a backend runs its creation tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// In declared order, stopping at the first error.
    Sequential,
    /// All at once. The first failing task in declared order is reported.
    Concurrent,
}

/// A named, run-once unit of work creating one node.
pub struct CreationTask<'a> {
    name: String,
    role: NodeRole,
    run: Box<dyn FnOnce() -> LocalBoxFuture<'a, Result<()>> + 'a>,
}

impl<'a> CreationTask<'a> {
    pub fn new<F, Fut>(name: impl Into<String>, role: NodeRole, run: F) -> Self
    where
        F: FnOnce() -> Fut + 'a,
        Fut: Future<Output = Result<()>> + 'a,
    {
        Self {
            name: name.into(),
            role,
            run: Box::new(move || run().boxed_local()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> &NodeRole {
        &self.role
    }

    pub async fn run(self) -> Result<()> {
        let name = self.name;
        (self.run)()
            .await
            .with_context(|| format!("failed to create node {name}"))
    }
}

impl std::fmt::Debug for CreationTask<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreationTask")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Build one creation task per node in `config`, in declared order.
///
/// Every task owns a clone of its node specification. Control-plane tasks
/// publish the API server port on their clone before launch. Any role other
/// than control-plane or worker fails planning before a task exists.
pub fn plan_creation<'a, L: NodeLauncher>(
    launcher: &'a L,
    cluster: &str,
    config: &ClusterConfig,
    fixups: &'a [PostCreateFixup],
) -> Result<Vec<CreationTask<'a>>, PlanError> {
    let api_server = PortMapping {
        listen_address: config.networking.api_server_address.clone(),
        host_port: config.networking.api_server_port,
        container_port: API_SERVER_INTERNAL_PORT,
        protocol: PortProtocol::Tcp,
    };

    let mut namer = NodeNamer::new(cluster);
    let mut tasks = Vec::with_capacity(config.nodes.len());
    for node in &config.nodes {
        let extra_mapping = match &node.role {
            NodeRole::ControlPlane => Some(api_server.clone()),
            NodeRole::Worker => None,
            NodeRole::Other(role) => return Err(PlanError::UnknownRole(role.clone())),
        };
        let name = namer.next_name(&node.role);
        let spec = node.clone();
        let cluster = cluster.to_string();
        let task_name = name.clone();

        tasks.push(CreationTask::new(task_name, node.role.clone(), move || async move {
            let mut spec = spec;
            if let Some(mapping) = extra_mapping {
                spec.extra_port_mappings.push(mapping);
            }
            launcher
                .launch(&LaunchRequest {
                    name: &name,
                    cluster: &cluster,
                    spec: &spec,
                })
                .await?;
            for fixup in fixups {
                fixup.apply(launcher.transport(), &name).await?;
            }
            Ok(())
        }));
    }
    Ok(tasks)
}

/// Run `tasks` under `policy`.
pub async fn run_tasks(tasks: Vec<CreationTask<'_>>, policy: ExecutionPolicy) -> Result<()> {
    match policy {
        ExecutionPolicy::Sequential => {
            for task in tasks {
                task.run().await?;
            }
            Ok(())
        }
        ExecutionPolicy::Concurrent => {
            let results = join_all(tasks.into_iter().map(CreationTask::run)).await;
            let mut failures = results.into_iter().filter_map(Result::err);
            let Some(first) = failures.next() else {
                return Ok(());
            };
            for other in failures {
                tracing::warn!(error = %format!("{other:#}"), "additional node creation failure");
            }
            Err(first)
        }
    }
}
