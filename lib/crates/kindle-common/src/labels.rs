//! Labels stamped on every node so that cluster membership and role can be
//! discovered live from the backend.

use crate::types::NodeRole;

pub const CLUSTER_LABEL_KEY: &str = "kindle.cluster";
pub const ROLE_LABEL_KEY: &str = "kindle.role";

#[must_use]
pub fn cluster_label(cluster: &str) -> String {
    format!("{CLUSTER_LABEL_KEY}={cluster}")
}

#[must_use]
pub fn role_label(role: &NodeRole) -> String {
    format!("{ROLE_LABEL_KEY}={role}")
}
