use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{NodeRole, NodeSpec};

/// Structural problems in a cluster configuration.
///
/// Role validation is left to the planner, which rejects unknown roles
/// before any node is created.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cluster configuration declares no nodes")]
    NoNodes,

    #[error("node {index} has an empty image reference")]
    EmptyImage { index: usize },

    #[error("node {index} requests zero CPUs")]
    ZeroCpus { index: usize },

    #[error("node {index} has an invalid memory size: {memory:?}")]
    InvalidMemory { index: usize, memory: String },
}

/// Where the API server of the control-plane node is published on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    #[serde(default = "default_api_server_address")]
    pub api_server_address: String,
    /// Zero lets the backend choose a free host port.
    #[serde(default)]
    pub api_server_port: u16,
}

impl Default for Networking {
    fn default() -> Self {
        Self {
            api_server_address: default_api_server_address(),
            api_server_port: 0,
        }
    }
}

fn default_api_server_address() -> String {
    "127.0.0.1".to_string()
}

/// Declarative description of a cluster, read from `--config` or defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_nodes")]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub networking: Networking,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: None,
            nodes: default_nodes(),
            networking: Networking::default(),
        }
    }
}

fn default_nodes() -> Vec<NodeSpec> {
    vec![NodeSpec::new(NodeRole::ControlPlane)]
}

impl ClusterConfig {
    /// Distinct node images, sorted.
    #[must_use]
    pub fn required_node_images(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(|node| node.image.as_str()).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if node.image.trim().is_empty() {
                return Err(ConfigError::EmptyImage { index });
            }
            if node.cpus == 0 {
                return Err(ConfigError::ZeroCpus { index });
            }
            if !is_valid_memory(&node.memory) {
                return Err(ConfigError::InvalidMemory {
                    index,
                    memory: node.memory.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Accepts sizes such as `2GB`, `512M` or `1024`, rejecting zero.
fn is_valid_memory(memory: &str) -> bool {
    let digits: String = memory.chars().take_while(char::is_ascii_digit).collect();
    let unit = &memory[digits.len()..];
    let Ok(amount) = digits.parse::<u64>() else {
        return false;
    };
    amount > 0 && unit.chars().all(|c| c.is_ascii_alphabetic())
}
