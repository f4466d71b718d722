//! Shared types for kindle: cluster configuration, node specifications and
//! the labels every backend stamps on the nodes it creates.

pub mod config;
pub mod labels;
pub mod types;

pub use config::{ClusterConfig, ConfigError, Networking};
pub use types::{NodeRole, NodeSpec, PortMapping, PortProtocol, ProviderKind};
