//! Deterministic node naming.

use std::collections::HashMap;

use kindle_common::NodeRole;

/// Hands out `<cluster>-<role>[N]` names.
///
/// The first node of a role carries no suffix, the second gets `2`, and so on.
#[derive(Debug)]
pub struct NodeNamer {
    cluster: String,
    counters: HashMap<String, u32>,
}

impl NodeNamer {
    #[must_use]
    pub fn new(cluster: &str) -> Self {
        Self {
            cluster: cluster.to_string(),
            counters: HashMap::new(),
        }
    }

    pub fn next_name(&mut self, role: &NodeRole) -> String {
        let count = self.counters.entry(role.as_str().to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            format!("{}-{role}", self.cluster)
        } else {
            format!("{}-{role}{count}", self.cluster)
        }
    }
}
