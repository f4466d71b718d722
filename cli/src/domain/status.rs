//! Parsing of node identity and addresses out of backend output.

use kindle_common::NodeRole;
use serde::{Deserialize, Serialize};

use crate::domain::error::NodeError;

/// Addresses a node reports on its primary network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeAddress {
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

impl NodeAddress {
    /// IPv4 when present, otherwise IPv6.
    #[must_use]
    pub fn preferred(&self) -> Option<&str> {
        self.ipv4.as_deref().or(self.ipv6.as_deref())
    }

    fn from_candidates<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Result<Self, NodeError> {
        let mut address = Self {
            ipv4: None,
            ipv6: None,
        };
        for candidate in candidates.into_iter().map(str::trim) {
            if candidate.is_empty() {
                continue;
            }
            if candidate.contains(':') {
                address.ipv6.get_or_insert_with(|| candidate.to_string());
            } else {
                address.ipv4.get_or_insert_with(|| candidate.to_string());
            }
        }
        if address.preferred().is_none() {
            return Err(NodeError::NoAddress);
        }
        Ok(address)
    }
}

#[derive(Deserialize)]
struct VmObject {
    status: Option<VmStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VmStatus {
    #[serde(default)]
    ip_addresses: Vec<String>,
}

/// Extracts addresses from `ignite inspect vm` JSON.
pub fn parse_vm_status(raw: &[u8]) -> Result<NodeAddress, NodeError> {
    let vm: VmObject =
        serde_json::from_slice(raw).map_err(|e| NodeError::MalformedStatus(e.to_string()))?;
    let status = vm
        .status
        .ok_or_else(|| NodeError::MalformedStatus("missing status field".to_string()))?;
    NodeAddress::from_candidates(status.ip_addresses.iter().map(String::as_str))
}

/// Extracts addresses from `docker inspect` output formatted as `ipv4,ipv6`.
pub fn parse_network_addresses(lines: &[String]) -> Result<NodeAddress, NodeError> {
    let [line] = lines else {
        return Err(NodeError::MalformedStatus(format!(
            "expected one address line, got {}",
            lines.len()
        )));
    };
    let Some((ipv4, ipv6)) = line.split_once(',') else {
        return Err(NodeError::MalformedStatus(format!(
            "expected \"ipv4,ipv6\", got {line:?}"
        )));
    };
    NodeAddress::from_candidates([ipv4, ipv6])
}

/// Interprets the output of a role label query.
pub fn single_role(lines: &[String]) -> Result<NodeRole, NodeError> {
    match lines {
        [] => Err(NodeError::MissingRole),
        [line] if line.trim().is_empty() || line.trim() == "<no value>" => {
            Err(NodeError::MissingRole)
        }
        [line] => Ok(NodeRole::from(line.trim())),
        many => Err(NodeError::AmbiguousRole { lines: many.len() }),
    }
}
