//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Command errors ────────────────────────────────────────────────────────────

/// Failure of one command submitted to a node through its backend.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command \"{command}\" exited with {}: {stderr}", describe_code(.code))]
    Exit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to run command \"{command}\"")]
    Transport {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stage standard input for copy")]
    Staging {
        #[source]
        source: std::io::Error,
    },

    #[error("invalid command \"{command}\": {reason}")]
    Invalid { command: String, reason: String },
}

impl CommandError {
    /// Whether submitting the same command again may succeed.
    ///
    /// Staging and malformed commands fail the same way every time.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exit { .. } | Self::Transport { .. })
    }
}

#[allow(clippy::ref_option)]
fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
}

// ── Node errors ───────────────────────────────────────────────────────────────

/// Errors reading a node's identity back from backend metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeError {
    #[error("node has no role label")]
    MissingRole,

    #[error("expected one role label line, backend returned {lines}")]
    AmbiguousRole { lines: usize },

    #[error("malformed node status: {0}")]
    MalformedStatus(String),

    #[error("node reports no IP address")]
    NoAddress,
}

// ── Planning errors ───────────────────────────────────────────────────────────

/// Errors turning a cluster configuration into creation tasks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("unknown node role {0:?}")]
    UnknownRole(String),
}

// ── Endpoint errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("cluster has no control-plane node")]
    NoControlPlane,

    #[error("cluster has {0} control-plane nodes but no external load balancer")]
    MultipleControlPlanes(usize),
}
