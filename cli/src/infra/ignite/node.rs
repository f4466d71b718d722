//! ignite node handle and its shell-string command transport.

use std::fmt;
use std::io::Write;
use std::process::Output;
use std::sync::Arc;

use anyhow::{Context, Result};
use kindle_common::NodeRole;
use kindle_common::labels::ROLE_LABEL_KEY;
use tempfile::NamedTempFile;

use crate::application::command::{Invocation, NodeCommand, output_lines};
use crate::application::ports::{CommandRunner, CommandTransport, Node};
use crate::domain::CommandError;
use crate::domain::shell;
use crate::domain::status::{NodeAddress, parse_vm_status, single_role};
use crate::infra::backend::{as_strs, invoke, invoke_with_stdin, spawn};

/// Flags ignite needs on every VM-level call to use the docker runtime.
pub(super) const RUNTIME_ARGS: [&str; 2] = ["--runtime=docker", "--network-plugin=docker-bridge"];

/// Argument naming the live standard-input stream in a copy.
const STDIN_PATH: &str = "/dev/stdin";

/// Runs commands in ignite VMs through `ignite exec` and `ignite cp`.
///
/// `ignite exec` accepts a single command string, so arguments are shell
/// quoted. It cannot stream stdin into a copy, so copies from `/dev/stdin`
/// are staged through a temporary file.
pub struct IgniteTransport<R> {
    runner: Arc<R>,
    binary: Arc<str>,
}

impl<R> Clone for IgniteTransport<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            binary: Arc::clone(&self.binary),
        }
    }
}

impl<R: CommandRunner> IgniteTransport<R> {
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

    fn exec_args(node: &str, invocation: &Invocation) -> Vec<String> {
        let env = invocation
            .env
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>();
        let words = if env.is_empty() {
            Vec::new()
        } else {
            let mut words = vec!["env"];
            words.extend(env.iter().map(String::as_str));
            words
        };
        let script = shell::join(words.into_iter().chain(invocation.argv()));

        let mut args: Vec<String> = RUNTIME_ARGS.iter().map(ToString::to_string).collect();
        args.extend(["exec".to_string(), node.to_string(), script]);
        args
    }

    async fn copy(&self, node: &str, invocation: &Invocation) -> Result<Output, CommandError> {
        let Some((dest, sources)) = invocation.args.split_last() else {
            return Err(CommandError::Invalid {
                command: invocation.to_string(),
                reason: "copy needs a source and a destination".to_string(),
            });
        };
        if sources.is_empty() {
            return Err(CommandError::Invalid {
                command: invocation.to_string(),
                reason: "copy needs a source and a destination".to_string(),
            });
        }

        // Staged files live until this function returns.
        let mut staged = Vec::new();
        let mut args = vec!["cp".to_string()];
        for source in sources {
            if source.contains(STDIN_PATH) {
                let file = stage_stdin(invocation.stdin.as_deref().unwrap_or_default())?;
                args.push(file.path().display().to_string());
                staged.push(file);
            } else {
                args.push(source.clone());
            }
        }
        args.push(format!("{node}:{dest}"));

        invoke(self.runner(), self.binary(), &as_strs(&args)).await
    }
}

fn stage_stdin(input: &[u8]) -> Result<NamedTempFile, CommandError> {
    let stage = |input: &[u8]| -> std::io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new().prefix("kindle-file-").tempfile()?;
        file.write_all(input)?;
        file.flush()?;
        Ok(file)
    };
    stage(input).map_err(|source| CommandError::Staging { source })
}

impl<R: CommandRunner> CommandTransport for IgniteTransport<R> {
    async fn exec(&self, node: &str, invocation: &Invocation) -> Result<Output, CommandError> {
        if invocation.program == "cp" {
            return self.copy(node, invocation).await;
        }
        let args = Self::exec_args(node, invocation);
        match &invocation.stdin {
            Some(input) => invoke_with_stdin(self.runner(), self.binary(), &as_strs(&args), input).await,
            None => invoke(self.runner(), self.binary(), &as_strs(&args)).await,
        }
    }

    fn spawn(&self, node: &str, invocation: &Invocation) -> Result<tokio::process::Child, CommandError> {
        if invocation.program == "cp" {
            return Err(CommandError::Invalid {
                command: invocation.to_string(),
                reason: "copies cannot run in the background".to_string(),
            });
        }
        let args = Self::exec_args(node, invocation);
        spawn(self.runner(), self.binary(), &as_strs(&args), invocation.stdin.as_deref())
    }
}

/// Handle to one ignite VM.
pub struct IgniteNode<R> {
    name: String,
    transport: IgniteTransport<R>,
}

impl<R: CommandRunner> IgniteNode<R> {
    pub(super) fn new(name: String, transport: IgniteTransport<R>) -> Self {
        Self { name, transport }
    }
}

impl<R> fmt::Display for IgniteNode<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<R: CommandRunner> Node for IgniteNode<R> {
    type Transport = IgniteTransport<R>;

    fn name(&self) -> &str {
        &self.name
    }

    async fn role(&self) -> Result<NodeRole> {
        let template = format!("{{{{ index .ObjectMeta.Labels \"{ROLE_LABEL_KEY}\" }}}}");
        let output = invoke(
            self.transport.runner(),
            self.transport.binary(),
            &["inspect", "vm", &self.name, "--template", &template],
        )
        .await
        .context("failed to get role for node")?;
        single_role(&output_lines(&output)).context("failed to get role for node")
    }

    async fn ip(&self) -> Result<NodeAddress> {
        let output = invoke(
            self.transport.runner(),
            self.transport.binary(),
            &["inspect", "vm", &self.name],
        )
        .await
        .context("failed to get vm details")?;
        Ok(parse_vm_status(&output.stdout)?)
    }

    fn command(&self, program: &str, args: &[&str]) -> NodeCommand<'_, Self::Transport> {
        NodeCommand::new(&self.transport, &self.name, program, args)
    }
}
