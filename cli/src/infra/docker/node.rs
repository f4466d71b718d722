//! docker node handle and its argv command transport.

use std::fmt;
use std::process::Output;
use std::sync::Arc;

use anyhow::{Context, Result};
use kindle_common::NodeRole;
use kindle_common::labels::ROLE_LABEL_KEY;

use crate::application::command::{Invocation, NodeCommand, output_lines};
use crate::application::ports::{CommandRunner, CommandTransport, Node};
use crate::domain::CommandError;
use crate::domain::status::{NodeAddress, parse_network_addresses, single_role};
use crate::infra::backend::{as_strs, invoke, invoke_with_stdin, spawn};

const ADDRESS_FORMAT: &str =
    "{{range .NetworkSettings.Networks}}{{.IPAddress}},{{.GlobalIPv6Address}}{{end}}";

/// Runs commands in docker containers through `docker exec`.
///
/// The argv vector is passed through unchanged and stdin is streamed with
/// `-i`, so copies from `/dev/stdin` need no staging.
pub struct DockerTransport<R> {
    runner: Arc<R>,
    binary: Arc<str>,
}

impl<R> Clone for DockerTransport<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            binary: Arc::clone(&self.binary),
        }
    }
}

impl<R: CommandRunner> DockerTransport<R> {
    pub fn new(runner: R, binary: &str) -> Self {
        Self {
            runner: Arc::new(runner),
            binary: Arc::from(binary),
        }
    }

    pub(super) fn runner(&self) -> &R {
        &self.runner
    }

    pub(super) fn binary(&self) -> &str {
        &self.binary
    }

    pub(super) fn exec_args(node: &str, invocation: &Invocation, interactive: bool) -> Vec<String> {
        let mut args = vec!["exec".to_string(), "--privileged".to_string()];
        if interactive {
            args.push("-i".to_string());
        }
        for (key, value) in &invocation.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(node.to_string());
        args.extend(invocation.argv().map(ToString::to_string));
        args
    }
}

impl<R: CommandRunner> CommandTransport for DockerTransport<R> {
    async fn exec(&self, node: &str, invocation: &Invocation) -> Result<Output, CommandError> {
        match &invocation.stdin {
            Some(input) => {
                let args = Self::exec_args(node, invocation, true);
                invoke_with_stdin(self.runner(), self.binary(), &as_strs(&args), input).await
            }
            None => {
                let args = Self::exec_args(node, invocation, false);
                invoke(self.runner(), self.binary(), &as_strs(&args)).await
            }
        }
    }

    fn spawn(&self, node: &str, invocation: &Invocation) -> Result<tokio::process::Child, CommandError> {
        let input = invocation.stdin.as_deref();
        let args = Self::exec_args(node, invocation, input.is_some());
        spawn(self.runner(), self.binary(), &as_strs(&args), input)
    }
}

/// Handle to one docker container node.
pub struct DockerNode<R> {
    name: String,
    transport: DockerTransport<R>,
}

impl<R: CommandRunner> DockerNode<R> {
    pub(super) fn new(name: String, transport: DockerTransport<R>) -> Self {
        Self { name, transport }
    }
}

impl<R> fmt::Display for DockerNode<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<R: CommandRunner> Node for DockerNode<R> {
    type Transport = DockerTransport<R>;

    fn name(&self) -> &str {
        &self.name
    }

    async fn role(&self) -> Result<NodeRole> {
        let format = format!("{{{{ index .Config.Labels \"{ROLE_LABEL_KEY}\" }}}}");
        let output = invoke(
            self.transport.runner(),
            self.transport.binary(),
            &["inspect", "--format", &format, &self.name],
        )
        .await
        .context("failed to get role for node")?;
        single_role(&output_lines(&output)).context("failed to get role for node")
    }

    async fn ip(&self) -> Result<NodeAddress> {
        let output = invoke(
            self.transport.runner(),
            self.transport.binary(),
            &["inspect", "-f", ADDRESS_FORMAT, &self.name],
        )
        .await
        .context("failed to get container details")?;
        parse_network_addresses(&output_lines(&output)).context("failed to get container details")
    }

    fn command(&self, program: &str, args: &[&str]) -> NodeCommand<'_, Self::Transport> {
        NodeCommand::new(&self.transport, &self.name, program, args)
    }
}
