use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Node image used when a node specification does not name one.
pub const DEFAULT_NODE_IMAGE: &str = "kindest/node:v1.29.2";

/// Port the API server listens on inside every control-plane node.
pub const API_SERVER_INTERNAL_PORT: u16 = 6443;

/// Role a node plays in the cluster.
///
/// Unknown role strings are preserved in [`NodeRole::Other`] so that the
/// planner can reject them with the offending value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeRole {
    ControlPlane,
    Worker,
    Other(String),
}

impl NodeRole {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ControlPlane => "control-plane",
            Self::Worker => "worker",
            Self::Other(role) => role,
        }
    }
}

impl From<String> for NodeRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            "control-plane" => Self::ControlPlane,
            "worker" => Self::Worker,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for NodeRole {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<NodeRole> for String {
    fn from(role: NodeRole) -> Self {
        match role {
            NodeRole::Other(role) => role,
            known => known.as_str().to_owned(),
        }
    }
}

impl FromStr for NodeRole {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Sctp => "sctp",
        })
    }
}

/// A host port forwarded into a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Host address to bind. Empty binds every interface.
    #[serde(default)]
    pub listen_address: String,
    /// Host port. Zero lets the backend pick one.
    #[serde(default)]
    pub host_port: u16,
    pub container_port: u16,
    #[serde(default)]
    pub protocol: PortProtocol,
}

impl PortMapping {
    /// Renders the mapping in `[address:][host_port:]container_port/protocol`
    /// form. IPv6 listen addresses are bracketed.
    #[must_use]
    pub fn to_publish_arg(&self) -> String {
        let target = format!("{}/{}", self.container_port, self.protocol);
        let host_port = if self.host_port == 0 {
            String::new()
        } else {
            self.host_port.to_string()
        };
        match self.listen_address.as_str() {
            "" if host_port.is_empty() => target,
            "" => format!("{host_port}:{target}"),
            addr if addr.contains(':') => format!("[{addr}]:{host_port}:{target}"),
            addr => format!("{addr}:{host_port}:{target}"),
        }
    }
}

/// Declarative description of one node to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub role: NodeRole,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_cpus")]
    pub cpus: u32,
    #[serde(default = "default_memory")]
    pub memory: String,
    #[serde(default = "default_disk_size")]
    pub disk_size: String,
    /// Kernel OCI image, only meaningful for micro-VM backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_port_mappings: Vec<PortMapping>,
}

impl NodeSpec {
    #[must_use]
    pub fn new(role: NodeRole) -> Self {
        Self {
            role,
            image: default_image(),
            cpus: default_cpus(),
            memory: default_memory(),
            disk_size: default_disk_size(),
            kernel_image: None,
            extra_port_mappings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }
}

fn default_image() -> String {
    DEFAULT_NODE_IMAGE.to_string()
}

fn default_cpus() -> u32 {
    1
}

fn default_memory() -> String {
    "2GB".to_string()
}

fn default_disk_size() -> String {
    "10G".to_string()
}

/// Which backend hosts the cluster nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Firecracker micro-VMs managed by ignite
    Ignite,
    /// Containers managed by docker
    #[default]
    Docker,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ignite => "ignite",
            Self::Docker => "docker",
        })
    }
}
