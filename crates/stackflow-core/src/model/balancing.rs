//! Application load balancing: target groups, load balancers, listeners

use super::LogicalId;
use serde::{Deserialize, Serialize};

/// Shortest health check timeout the provider accepts, in seconds
pub const MIN_HEALTH_CHECK_TIMEOUT_SECS: u32 = 2;

/// Longest target group name the provider accepts
pub const MAX_TARGET_GROUP_NAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationProtocol {
    Http,
    Https,
}

impl ApplicationProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationProtocol::Http => "HTTP",
            ApplicationProtocol::Https => "HTTPS",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ApplicationProtocol::Http => 80,
            ApplicationProtocol::Https => 443,
        }
    }
}

/// Target group health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub timeout_secs: u32,
    pub interval_secs: u32,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            interval_secs: 30,
        }
    }
}

impl HealthCheck {
    pub fn with_timeout(timeout_secs: u32) -> Self {
        Self {
            timeout_secs,
            ..Default::default()
        }
    }
}

/// Instances behind a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub vpc: LogicalId,
    pub name: String,
    pub port: u16,
    pub protocol: ApplicationProtocol,
    /// Instance ids, registered in order
    pub targets: Vec<LogicalId>,
    pub health_check: HealthCheck,
}

/// Application load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub vpc: LogicalId,
    pub subnets: Vec<LogicalId>,
    pub security_groups: Vec<LogicalId>,
    pub internet_facing: bool,
}

impl LoadBalancer {
    pub fn scheme(&self) -> &'static str {
        if self.internet_facing {
            "internet-facing"
        } else {
            "internal"
        }
    }
}

/// Listener forwarding everything it receives to its target groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub load_balancer: LogicalId,
    pub port: u16,
    pub protocol: ApplicationProtocol,
    pub default_target_groups: Vec<LogicalId>,
}
