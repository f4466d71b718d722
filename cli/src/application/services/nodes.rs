//! Selecting nodes by role and locating the API server.

use anyhow::{Context, Result};
use kindle_common::NodeRole;
use kindle_common::types::API_SERVER_INTERNAL_PORT;

use crate::application::ports::{Node, Provider};
use crate::domain::{EndpointError, NodeError};

/// First node, in listing order, whose role label reads control-plane.
pub async fn first_control_plane<N: Node>(nodes: &[N]) -> Result<&N> {
    for node in nodes {
        if node_role(node).await? == NodeRole::ControlPlane {
            return Ok(node);
        }
    }
    Err(EndpointError::NoControlPlane.into())
}

/// The single control-plane node hosting the API server.
pub async fn api_server_node<N: Node>(nodes: &[N]) -> Result<&N> {
    let mut control_planes = Vec::new();
    for node in nodes {
        if node_role(node).await? == NodeRole::ControlPlane {
            control_planes.push(node);
        }
    }
    match control_planes.as_slice() {
        [] => Err(EndpointError::NoControlPlane.into()),
        [node] => Ok(node),
        many => Err(EndpointError::MultipleControlPlanes(many.len()).into()),
    }
}

async fn node_role<N: Node>(node: &N) -> Result<NodeRole> {
    node.role()
        .await
        .with_context(|| format!("failed to get role for node {node}"))
}

/// `host:6443`, with IPv6 hosts bracketed.
#[must_use]
pub fn format_endpoint(host: &str) -> String {
    if host.contains(':') {
        format!("[{host}]:{API_SERVER_INTERNAL_PORT}")
    } else {
        format!("{host}:{API_SERVER_INTERNAL_PORT}")
    }
}

/// Resolve the API server endpoint of `cluster` on any provider.
pub async fn resolve_api_server_endpoint<P: Provider>(provider: &P, cluster: &str) -> Result<String> {
    let nodes = provider.list_nodes(cluster).await?;
    let node = api_server_node(&nodes)
        .await
        .context("failed to get api server endpoint")?;
    let address = node
        .ip()
        .await
        .with_context(|| format!("failed to get IP for node {node}"))?;
    let host = address.ipv4.ok_or(NodeError::NoAddress).with_context(|| {
        format!("node {node} has no IPv4 address")
    })?;
    Ok(format_endpoint(&host))
}
