//! Security groups

use super::LogicalId;
use crate::cidr::Cidr;
use serde::{Deserialize, Serialize};

/// IP protocol of an ingress rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// Single allowed inbound flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: Protocol,
    pub port: u16,
    pub peer: Cidr,
    pub description: String,
}

impl IngressRule {
    pub fn tcp(peer: Cidr, port: u16, description: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Tcp,
            port,
            peer,
            description: description.into(),
        }
    }

    /// Same flow, ignoring the description
    pub fn same_flow(&self, other: &IngressRule) -> bool {
        self.protocol == other.protocol && self.port == other.port && self.peer == other.peer
    }
}

/// Named set of allowed traffic
///
/// Ingress rules are additive; there are no deny rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub vpc: LogicalId,
    pub group_name: String,
    pub description: String,
    pub ingress: Vec<IngressRule>,
    pub allow_all_outbound: bool,
}

impl SecurityGroup {
    pub fn new(
        vpc: LogicalId,
        group_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            vpc,
            group_name: group_name.into(),
            description: description.into(),
            ingress: Vec::new(),
            allow_all_outbound: true,
        }
    }

    /// Add a rule; returns false when the same flow is already allowed
    pub fn allow(&mut self, rule: IngressRule) -> bool {
        if self.ingress.iter().any(|r| r.same_flow(&rule)) {
            return false;
        }
        self.ingress.push(rule);
        true
    }

    pub fn allows_port(&self, port: u16) -> bool {
        self.ingress.iter().any(|r| r.port == port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_names() {
        assert_eq!(serde_json::from_str::<Protocol>("\"udp\"").unwrap(), Protocol::Udp);
        assert_eq!(Protocol::Tcp.as_str(), "tcp");
        assert!(serde_json::from_str::<Protocol>("\"icmp\"").is_err());
    }

    #[test]
    fn test_allow_skips_same_flow() {
        let mut sg = SecurityGroup::new(LogicalId::new("vpc").unwrap(), "web", "web");
        assert!(sg.allow(IngressRule::tcp(Cidr::any_ipv4(), 80, "http")));
        assert!(!sg.allow(IngressRule::tcp(Cidr::any_ipv4(), 80, "again")));
        assert!(sg.allow(IngressRule::tcp(Cidr::any_ipv4(), 22, "ssh")));
        assert_eq!(sg.ingress.len(), 2);
        assert!(sg.allows_port(22));
        assert!(!sg.allows_port(443));
    }
}
