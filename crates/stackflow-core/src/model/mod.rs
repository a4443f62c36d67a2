//! Resource descriptors
//!
//! Resources refer to each other by [`LogicalId`], never by object
//! reference, so a graph can be validated and serialized on its own.

mod balancing;
mod compute;
mod network;
mod security;

// Re-exports
pub use balancing::*;
pub use compute::*;
pub use network::*;
pub use security::*;

use crate::error::{Result, StackError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a resource within its stack
///
/// Any non-empty string with at least one ASCII alphanumeric character.
/// The template key is the alphanumeric part only (see [`LogicalId::template_key`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if !id.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(StackError::InvalidConfig(format!(
                "logical id '{}' needs at least one alphanumeric character",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under `Resources` in the synthesized template
    pub fn template_key(&self) -> String {
        self.0.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resource kind, one per [`Resource`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vpc,
    Subnet,
    InternetGateway,
    GatewayAttachment,
    Route,
    NatGateway,
    SecurityGroup,
    Instance,
    TargetGroup,
    LoadBalancer,
    Listener,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 11] = [
        ResourceKind::Vpc,
        ResourceKind::Subnet,
        ResourceKind::InternetGateway,
        ResourceKind::GatewayAttachment,
        ResourceKind::Route,
        ResourceKind::NatGateway,
        ResourceKind::SecurityGroup,
        ResourceKind::Instance,
        ResourceKind::TargetGroup,
        ResourceKind::LoadBalancer,
        ResourceKind::Listener,
    ];

    /// CloudFormation type of the primary resource
    pub fn cfn_type(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "AWS::EC2::VPC",
            ResourceKind::Subnet => "AWS::EC2::Subnet",
            ResourceKind::InternetGateway => "AWS::EC2::InternetGateway",
            ResourceKind::GatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            ResourceKind::Route => "AWS::EC2::Route",
            ResourceKind::NatGateway => "AWS::EC2::NatGateway",
            ResourceKind::SecurityGroup => "AWS::EC2::SecurityGroup",
            ResourceKind::Instance => "AWS::EC2::Instance",
            ResourceKind::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            ResourceKind::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            ResourceKind::Listener => "AWS::ElasticLoadBalancingV2::Listener",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::Subnet => "subnet",
            ResourceKind::InternetGateway => "internet-gateway",
            ResourceKind::GatewayAttachment => "gateway-attachment",
            ResourceKind::Route => "route",
            ResourceKind::NatGateway => "nat-gateway",
            ResourceKind::SecurityGroup => "security-group",
            ResourceKind::Instance => "instance",
            ResourceKind::TargetGroup => "target-group",
            ResourceKind::LoadBalancer => "load-balancer",
            ResourceKind::Listener => "listener",
        };
        f.write_str(s)
    }
}

/// Any declarable resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    Vpc(Vpc),
    Subnet(Subnet),
    InternetGateway(InternetGateway),
    GatewayAttachment(GatewayAttachment),
    Route(Route),
    NatGateway(NatGateway),
    SecurityGroup(SecurityGroup),
    Instance(Instance),
    TargetGroup(TargetGroup),
    LoadBalancer(LoadBalancer),
    Listener(Listener),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Vpc(_) => ResourceKind::Vpc,
            Resource::Subnet(_) => ResourceKind::Subnet,
            Resource::InternetGateway(_) => ResourceKind::InternetGateway,
            Resource::GatewayAttachment(_) => ResourceKind::GatewayAttachment,
            Resource::Route(_) => ResourceKind::Route,
            Resource::NatGateway(_) => ResourceKind::NatGateway,
            Resource::SecurityGroup(_) => ResourceKind::SecurityGroup,
            Resource::Instance(_) => ResourceKind::Instance,
            Resource::TargetGroup(_) => ResourceKind::TargetGroup,
            Resource::LoadBalancer(_) => ResourceKind::LoadBalancer,
            Resource::Listener(_) => ResourceKind::Listener,
        }
    }

    /// Every resource this one points at, with the kind it must have
    pub fn references(&self) -> Vec<(&LogicalId, ResourceKind)> {
        match self {
            Resource::Vpc(_) | Resource::InternetGateway(_) => Vec::new(),
            Resource::Subnet(s) => vec![(&s.vpc, ResourceKind::Vpc)],
            Resource::GatewayAttachment(a) => vec![
                (&a.vpc, ResourceKind::Vpc),
                (&a.internet_gateway, ResourceKind::InternetGateway),
            ],
            Resource::Route(r) => {
                let mut refs = vec![(&r.subnet, ResourceKind::Subnet)];
                refs.push(match &r.target {
                    RouteTarget::InternetGateway(id) => (id, ResourceKind::InternetGateway),
                    RouteTarget::NatGateway(id) => (id, ResourceKind::NatGateway),
                });
                refs.extend(
                    r.depends_on
                        .iter()
                        .map(|id| (id, ResourceKind::GatewayAttachment)),
                );
                refs
            }
            Resource::NatGateway(n) => vec![(&n.subnet, ResourceKind::Subnet)],
            Resource::SecurityGroup(sg) => vec![(&sg.vpc, ResourceKind::Vpc)],
            Resource::Instance(i) => vec![
                (&i.subnet, ResourceKind::Subnet),
                (&i.security_group, ResourceKind::SecurityGroup),
            ],
            Resource::TargetGroup(tg) => {
                let mut refs = vec![(&tg.vpc, ResourceKind::Vpc)];
                refs.extend(tg.targets.iter().map(|id| (id, ResourceKind::Instance)));
                refs
            }
            Resource::LoadBalancer(lb) => {
                let mut refs = vec![(&lb.vpc, ResourceKind::Vpc)];
                refs.extend(lb.subnets.iter().map(|id| (id, ResourceKind::Subnet)));
                refs.extend(
                    lb.security_groups
                        .iter()
                        .map(|id| (id, ResourceKind::SecurityGroup)),
                );
                refs
            }
            Resource::Listener(l) => {
                let mut refs = vec![(&l.load_balancer, ResourceKind::LoadBalancer)];
                refs.extend(
                    l.default_target_groups
                        .iter()
                        .map(|id| (id, ResourceKind::TargetGroup)),
                );
                refs
            }
        }
    }

    /// Template keys this resource occupies once synthesized
    ///
    /// Subnets bring their route table and association; NAT gateways their
    /// elastic IP.
    pub fn template_keys(&self, id: &LogicalId) -> Vec<String> {
        let key = id.template_key();
        match self {
            Resource::Subnet(_) => vec![
                format!("{key}RouteTable"),
                format!("{key}RouteTableAssociation"),
                key,
            ],
            Resource::NatGateway(_) => vec![format!("{key}EIP"), key],
            _ => vec![key],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_id_validation() {
        assert!(LogicalId::new("").is_err());
        assert!(LogicalId::new("--").is_err());
        let id = LogicalId::new("test-samcorp-albtest--vpc").unwrap();
        assert_eq!(id.as_str(), "test-samcorp-albtest--vpc");
        assert_eq!(id.template_key(), "testsamcorpalbtestvpc");
    }

    #[test]
    fn test_references_follow_fields() {
        let vpc = LogicalId::new("vpc").unwrap();
        let lb = LoadBalancer {
            vpc: vpc.clone(),
            subnets: vec![LogicalId::new("a").unwrap(), LogicalId::new("c").unwrap()],
            security_groups: vec![LogicalId::new("sg").unwrap()],
            internet_facing: true,
        };
        let resource = Resource::LoadBalancer(lb);
        let refs = resource.references();
        let kinds: Vec<ResourceKind> = refs.iter().map(|(_, k)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::Vpc,
                ResourceKind::Subnet,
                ResourceKind::Subnet,
                ResourceKind::SecurityGroup
            ]
        );
    }

    #[test]
    fn test_subnet_template_keys() {
        let id = LogicalId::new("publicsubneta").unwrap();
        let subnet = Resource::Subnet(Subnet::public(
            LogicalId::new("vpc").unwrap(),
            "ap-northeast-2a",
            "10.0.30.0/24".parse().unwrap(),
        ));
        assert_eq!(
            subnet.template_keys(&id),
            vec![
                "publicsubnetaRouteTable",
                "publicsubnetaRouteTableAssociation",
                "publicsubneta"
            ]
        );
    }

    #[test]
    fn test_resource_serializes_with_type_tag() {
        let json = serde_json::to_value(Resource::InternetGateway(InternetGateway {})).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "internet_gateway" }));
    }
}
