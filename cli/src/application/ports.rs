//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `kindle_common`, never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Output;

use anyhow::Result;
use kindle_common::{ClusterConfig, NodeRole, NodeSpec};

use crate::application::command::{Invocation, NodeCommand};
use crate::domain::{CommandError, KindleSettings, NodeAddress};

// ── Process Port ──────────────────────────────────────────────────────────────

/// Abstraction over host process execution.
///
/// Errors are plain `io::Error`: spawn failures, pipe failures and timeouts
/// (`io::ErrorKind::TimedOut`). A non-zero exit is not an error at this level.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds the
    /// runner's timeout. On timeout, the child process must be killed.
    async fn run(&self, program: &str, args: &[&str]) -> io::Result<Output>;
    /// Run a program with stdin piped from `input`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8])
    -> io::Result<Output>;
    /// Spawn a program without waiting for it to finish.
    ///
    /// With `input`, stdin is piped and the bytes are written in the
    /// background, after which stdin is closed. Otherwise stdin is null.
    fn spawn(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&[u8]>,
    ) -> io::Result<tokio::process::Child>;
}

// ── Node Ports ────────────────────────────────────────────────────────────────

/// Backend-specific delivery of one command into a named node.
#[allow(async_fn_in_trait)]
pub trait CommandTransport {
    /// Submit `invocation` once and wait for it. A non-zero exit is
    /// `CommandError::Exit`.
    async fn exec(&self, node: &str, invocation: &Invocation) -> Result<Output, CommandError>;
    /// Start `invocation` without waiting for it.
    fn spawn(
        &self,
        node: &str,
        invocation: &Invocation,
    ) -> Result<tokio::process::Child, CommandError>;
}

/// Handle to one provisioned cluster member.
#[allow(async_fn_in_trait)]
pub trait Node: fmt::Display {
    type Transport: CommandTransport;

    /// Backend-assigned name.
    fn name(&self) -> &str;
    /// Role read back from the node's role label.
    async fn role(&self) -> Result<NodeRole>;
    /// Addresses from the backend's structured status.
    async fn ip(&self) -> Result<NodeAddress>;
    /// Build a command that runs inside this node.
    fn command(&self, program: &str, args: &[&str]) -> NodeCommand<'_, Self::Transport>;
}

// ── Provisioning Ports ────────────────────────────────────────────────────────

/// Parameters for one node launch.
pub struct LaunchRequest<'a> {
    pub name: &'a str,
    pub cluster: &'a str,
    pub spec: &'a NodeSpec,
}

/// Backend primitive that creates one labelled node.
#[allow(async_fn_in_trait)]
pub trait NodeLauncher {
    type Transport: CommandTransport;

    async fn launch(&self, request: &LaunchRequest<'_>) -> Result<()>;
    /// Transport used for post-creation fixups on launched nodes.
    fn transport(&self) -> &Self::Transport;
}

/// Backend primitive that makes a node image available locally.
#[allow(async_fn_in_trait)]
pub trait ImagePuller {
    /// Pull `image` unless the backend can tell it is already present.
    async fn pull_image(&self, image: &str) -> Result<()>;
}

/// Lifecycle of the nodes of every cluster on one backend.
#[allow(async_fn_in_trait)]
pub trait Provider {
    type Node: Node;

    /// Create every node of `config`, labelled as members of `cluster`.
    async fn provision(
        &self,
        reporter: &impl ProgressReporter,
        cluster: &str,
        config: &ClusterConfig,
    ) -> Result<()>;
    /// Names of every cluster with at least one node, sorted.
    async fn list_clusters(&self) -> Result<Vec<String>>;
    async fn list_nodes(&self, cluster: &str) -> Result<Vec<Self::Node>>;
    /// Force-remove `nodes` in one backend call. Empty input is a no-op.
    async fn delete_nodes(&self, nodes: &[Self::Node]) -> Result<()>;
    /// `host:port` of the cluster's API server.
    async fn api_server_endpoint(&self, cluster: &str) -> Result<String>;
}

// ── Presentation Port ─────────────────────────────────────────────────────────

/// Abstraction for status output, allowing services to emit progress without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Open a status line for a long-running stage.
    fn start(&self, message: &str);
    /// Close the open status line as succeeded or failed.
    fn end(&self, success: bool);
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Settings Port ─────────────────────────────────────────────────────────────

pub trait SettingsStore {
    /// Load settings, falling back to defaults when no file exists.
    fn load(&self) -> Result<KindleSettings>;
    fn path(&self) -> Result<PathBuf>;
}
