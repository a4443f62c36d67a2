//! Network resources: VPC, subnets, gateways and routes

use super::LogicalId;
use crate::cidr::Cidr;
use serde::{Deserialize, Serialize};

/// Virtual network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpc {
    pub cidr: Cidr,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
    /// Upper bound on distinct availability zones used by the subnets
    pub max_azs: u8,
    /// `Name` tag
    pub name: Option<String>,
}

impl Vpc {
    pub fn new(cidr: Cidr) -> Self {
        Self {
            cidr,
            enable_dns_hostnames: true,
            enable_dns_support: true,
            max_azs: 3,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_max_azs(mut self, max_azs: u8) -> Self {
        self.max_azs = max_azs;
        self
    }
}

/// Subnet reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetKind {
    /// Outbound only, through a NAT gateway
    Private,
    /// Routed to an internet gateway
    Public,
}

impl std::fmt::Display for SubnetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubnetKind::Private => write!(f, "Private"),
            SubnetKind::Public => write!(f, "Public"),
        }
    }
}

/// Subnet pinned to one availability zone
///
/// Every subnet owns a route table; routes are added to it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub vpc: LogicalId,
    pub kind: SubnetKind,
    pub availability_zone: String,
    pub cidr: Cidr,
    pub map_public_ip_on_launch: bool,
}

impl Subnet {
    pub fn private(vpc: LogicalId, availability_zone: impl Into<String>, cidr: Cidr) -> Self {
        Self {
            vpc,
            kind: SubnetKind::Private,
            availability_zone: availability_zone.into(),
            cidr,
            map_public_ip_on_launch: false,
        }
    }

    pub fn public(vpc: LogicalId, availability_zone: impl Into<String>, cidr: Cidr) -> Self {
        Self {
            vpc,
            kind: SubnetKind::Public,
            availability_zone: availability_zone.into(),
            cidr,
            map_public_ip_on_launch: true,
        }
    }

    pub fn is_public(&self) -> bool {
        self.kind == SubnetKind::Public
    }
}

/// Internet gateway; identity only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternetGateway {}

/// Attaches an internet gateway to a VPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAttachment {
    pub vpc: LogicalId,
    pub internet_gateway: LogicalId,
}

/// Where a route sends its traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum RouteTarget {
    InternetGateway(LogicalId),
    NatGateway(LogicalId),
}

impl RouteTarget {
    pub fn id(&self) -> &LogicalId {
        match self {
            RouteTarget::InternetGateway(id) | RouteTarget::NatGateway(id) => id,
        }
    }
}

/// Route in a subnet's route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub subnet: LogicalId,
    pub destination: Cidr,
    pub target: RouteTarget,
    /// Resources that must exist before the route (the gateway attachment)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
}

impl Route {
    pub fn is_default(&self) -> bool {
        self.destination.is_any()
    }
}

/// NAT gateway anchored in a public subnet
///
/// Synthesizes together with the elastic IP it allocates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatGateway {
    pub subnet: LogicalId,
}
