//! The "run a command inside node N" contract shared by every backend.

use std::fmt;
use std::process::Output;
use std::time::Duration;

use crate::application::ports::CommandTransport;
use crate::domain::CommandError;
use crate::domain::shell;

/// Delay before the single retry of a failed node command.
pub const COMMAND_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A logical command to run inside a node, independent of backend syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
}

impl Invocation {
    #[must_use]
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            env: Vec::new(),
            stdin: None,
        }
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell::join(self.argv()))
    }
}

/// Converts a captured process result into `CommandError::Exit` when the
/// process did not succeed.
pub fn ensure_success(command: String, output: Output) -> Result<Output, CommandError> {
    if output.status.success() {
        return Ok(output);
    }
    Err(CommandError::Exit {
        command,
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Splits captured stdout into trimmed, non-empty lines.
#[must_use]
pub fn output_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// A command bound to one node, built fluently and then run or started.
#[must_use = "a node command does nothing until it is run or started"]
pub struct NodeCommand<'a, T> {
    transport: &'a T,
    node: &'a str,
    invocation: Invocation,
}

impl<'a, T: CommandTransport> NodeCommand<'a, T> {
    pub fn new(transport: &'a T, node: &'a str, program: &str, args: &[&str]) -> Self {
        Self {
            transport,
            node,
            invocation: Invocation::new(program, args),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.invocation.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invocation.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.invocation.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.invocation.stdin = Some(input.into());
        self
    }

    #[must_use]
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Run to completion, retrying once after [`COMMAND_RETRY_DELAY`] when
    /// the backend reports a failure.
    pub async fn run(self) -> Result<Output, CommandError> {
        match self.transport.exec(self.node, &self.invocation).await {
            Err(err) if err.is_retryable() => {
                tracing::debug!(
                    node = self.node,
                    command = %self.invocation,
                    error = %err,
                    "node command failed, retrying once"
                );
                tokio::time::sleep(COMMAND_RETRY_DELAY).await;
                self.transport.exec(self.node, &self.invocation).await
            }
            result => result,
        }
    }

    /// Run and return stdout split into trimmed, non-empty lines.
    pub async fn output_lines(self) -> Result<Vec<String>, CommandError> {
        let output = self.run().await?;
        Ok(output_lines(&output))
    }

    /// Start without waiting. The caller owns the child process.
    pub fn start(self) -> Result<tokio::process::Child, CommandError> {
        self.transport.spawn(self.node, &self.invocation)
    }
}
