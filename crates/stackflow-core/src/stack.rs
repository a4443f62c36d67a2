//! Stack: the declared resource graph
//!
//! Resources are declared in order. Every declaration is checked against what
//! is already in the stack, so a reference can only point backwards and a
//! bad address plan fails here instead of at deploy time.

use crate::cidr::Cidr;
use crate::error::{Result, StackError};
use crate::model::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEntry {
    pub id: LogicalId,
    #[serde(flatten)]
    pub resource: Resource,
}

/// Serialized form; rebuilt through [`Stack::add`] on load
#[derive(Deserialize)]
struct RawStack {
    name: String,
    #[serde(default)]
    resources: Vec<StackEntry>,
}

/// Top-level declaration graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawStack")]
pub struct Stack {
    name: String,
    resources: Vec<StackEntry>,
    #[serde(skip)]
    index: HashMap<LogicalId, usize>,
    /// Template key -> owning resource
    #[serde(skip)]
    template_keys: HashMap<String, LogicalId>,
}

impl TryFrom<RawStack> for Stack {
    type Error = StackError;

    fn try_from(raw: RawStack) -> Result<Self> {
        Stack::from_entries(raw.name, raw.resources)
    }
}

impl PartialEq for Stack {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.resources == other.resources
    }
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
            index: HashMap::new(),
            template_keys: HashMap::new(),
        }
    }

    /// Rebuild a stack from entries, checking each in order
    pub fn from_entries(name: impl Into<String>, entries: Vec<StackEntry>) -> Result<Self> {
        let mut stack = Stack::new(name);
        for entry in entries {
            stack.add(entry.id.as_str(), entry.resource)?;
        }
        Ok(stack)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&LogicalId, &Resource)> {
        self.resources.iter().map(|e| (&e.id, &e.resource))
    }

    pub fn get(&self, id: &LogicalId) -> Option<&Resource> {
        self.index.get(id).map(|&i| &self.resources[i].resource)
    }

    pub fn by_kind(&self, kind: ResourceKind) -> Vec<(&LogicalId, &Resource)> {
        self.iter().filter(|(_, r)| r.kind() == kind).collect()
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.iter().filter(|(_, r)| r.kind() == kind).count()
    }

    pub fn subnet(&self, id: &LogicalId) -> Option<&Subnet> {
        match self.get(id) {
            Some(Resource::Subnet(s)) => Some(s),
            _ => None,
        }
    }

    pub fn vpc(&self, id: &LogicalId) -> Option<&Vpc> {
        match self.get(id) {
            Some(Resource::Vpc(v)) => Some(v),
            _ => None,
        }
    }

    pub fn security_group(&self, id: &LogicalId) -> Option<&SecurityGroup> {
        match self.get(id) {
            Some(Resource::SecurityGroup(sg)) => Some(sg),
            _ => None,
        }
    }

    pub fn load_balancer(&self, id: &LogicalId) -> Option<&LoadBalancer> {
        match self.get(id) {
            Some(Resource::LoadBalancer(lb)) => Some(lb),
            _ => None,
        }
    }

    /// Routes sending `0.0.0.0/0` out of `subnet`
    pub fn default_routes(&self, subnet: &LogicalId) -> Vec<(&LogicalId, &Route)> {
        self.iter()
            .filter_map(|(id, r)| match r {
                Resource::Route(route) if &route.subnet == subnet && route.is_default() => {
                    Some((id, route))
                }
                _ => None,
            })
            .collect()
    }

    /// Declare a resource under `id`
    ///
    /// Fails on a duplicate id or template key, a reference to an undeclared
    /// resource or one of the wrong kind, and on any kind-specific invariant.
    pub fn add(&mut self, id: &str, resource: Resource) -> Result<LogicalId> {
        let id = LogicalId::new(id)?;

        if self.index.contains_key(&id) {
            return Err(StackError::DuplicateLogicalId(id.to_string()));
        }
        let keys = resource.template_keys(&id);
        if let Some(key) = keys.iter().find(|k| self.template_keys.contains_key(*k)) {
            return Err(StackError::DuplicateLogicalId(format!(
                "{} (template key '{}' is taken by '{}')",
                id, key, self.template_keys[key]
            )));
        }

        for (target, expected) in resource.references() {
            let found = self
                .get(target)
                .ok_or_else(|| StackError::UnknownReference {
                    from: id.to_string(),
                    to: target.to_string(),
                })?
                .kind();
            if found != expected {
                return Err(StackError::ReferenceKindMismatch {
                    from: id.to_string(),
                    to: target.to_string(),
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }

        self.check(&id, &resource)?;

        tracing::debug!(stack = %self.name, id = %id, kind = %resource.kind(), "Declared resource");
        for key in keys {
            self.template_keys.insert(key, id.clone());
        }
        self.index.insert(id.clone(), self.resources.len());
        self.resources.push(StackEntry {
            id: id.clone(),
            resource,
        });
        Ok(id)
    }

    /// Re-check every invariant over the whole graph
    pub fn validate(&self) -> Result<()> {
        Stack::from_entries(self.name.clone(), self.resources.clone()).map(|_| ())
    }

    pub fn add_vpc(&mut self, id: &str, vpc: Vpc) -> Result<LogicalId> {
        self.add(id, Resource::Vpc(vpc))
    }

    pub fn add_subnet(&mut self, id: &str, subnet: Subnet) -> Result<LogicalId> {
        self.add(id, Resource::Subnet(subnet))
    }

    pub fn add_internet_gateway(&mut self, id: &str) -> Result<LogicalId> {
        self.add(id, Resource::InternetGateway(InternetGateway {}))
    }

    pub fn attach_internet_gateway(
        &mut self,
        id: &str,
        vpc: &LogicalId,
        internet_gateway: &LogicalId,
    ) -> Result<LogicalId> {
        self.add(
            id,
            Resource::GatewayAttachment(GatewayAttachment {
                vpc: vpc.clone(),
                internet_gateway: internet_gateway.clone(),
            }),
        )
    }

    /// `0.0.0.0/0` from a public subnet through the internet gateway.
    /// The route waits for `attachment`.
    pub fn add_default_internet_route(
        &mut self,
        subnet: &LogicalId,
        internet_gateway: &LogicalId,
        attachment: &LogicalId,
    ) -> Result<LogicalId> {
        self.add(
            &format!("{}DefaultRoute", subnet),
            Resource::Route(Route {
                subnet: subnet.clone(),
                destination: Cidr::any_ipv4(),
                target: RouteTarget::InternetGateway(internet_gateway.clone()),
                depends_on: vec![attachment.clone()],
            }),
        )
    }

    /// NAT gateway (and its elastic IP) in a public subnet
    pub fn add_nat_gateway(&mut self, subnet: &LogicalId) -> Result<LogicalId> {
        self.add(
            &format!("{}NATGateway", subnet),
            Resource::NatGateway(NatGateway {
                subnet: subnet.clone(),
            }),
        )
    }

    /// `0.0.0.0/0` from a private subnet through a NAT gateway
    pub fn add_default_nat_route(
        &mut self,
        subnet: &LogicalId,
        nat_gateway: &LogicalId,
    ) -> Result<LogicalId> {
        self.add(
            &format!("{}DefaultRoute", subnet),
            Resource::Route(Route {
                subnet: subnet.clone(),
                destination: Cidr::any_ipv4(),
                target: RouteTarget::NatGateway(nat_gateway.clone()),
                depends_on: Vec::new(),
            }),
        )
    }

    pub fn add_security_group(&mut self, id: &str, group: SecurityGroup) -> Result<LogicalId> {
        self.add(id, Resource::SecurityGroup(group))
    }

    /// Allow an inbound flow on a declared security group.
    /// Returns false when the flow was already allowed.
    pub fn add_ingress_rule(&mut self, group: &LogicalId, rule: IngressRule) -> Result<bool> {
        let index = *self.index.get(group).ok_or_else(|| StackError::UnknownReference {
            from: format!("ingress rule '{}'", rule.description),
            to: group.to_string(),
        })?;
        let found = self.resources[index].resource.kind();
        let Resource::SecurityGroup(sg) = &mut self.resources[index].resource else {
            return Err(StackError::ReferenceKindMismatch {
                from: format!("ingress rule '{}'", rule.description),
                to: group.to_string(),
                expected: ResourceKind::SecurityGroup.to_string(),
                found: found.to_string(),
            });
        };

        let port = rule.port;
        let added = sg.allow(rule);
        if added {
            tracing::debug!(group = %group, port, "Added ingress rule");
        } else {
            tracing::debug!(group = %group, port, "Ingress rule already present");
        }
        Ok(added)
    }

    pub fn add_instance(&mut self, id: &str, instance: Instance) -> Result<LogicalId> {
        self.add(id, Resource::Instance(instance))
    }

    pub fn add_target_group(&mut self, id: &str, group: TargetGroup) -> Result<LogicalId> {
        self.add(id, Resource::TargetGroup(group))
    }

    pub fn add_load_balancer(&mut self, id: &str, lb: LoadBalancer) -> Result<LogicalId> {
        self.add(id, Resource::LoadBalancer(lb))
    }

    pub fn add_listener(&mut self, id: &str, listener: Listener) -> Result<LogicalId> {
        self.add(id, Resource::Listener(listener))
    }

    /// Open the listener's port to all IPv4 on every security group of its
    /// load balancer
    pub fn allow_listener_port_from_any_ipv4(
        &mut self,
        listener: &LogicalId,
        description: &str,
    ) -> Result<()> {
        let Some(Resource::Listener(l)) = self.get(listener) else {
            return Err(StackError::UnknownReference {
                from: "listener port rule".to_string(),
                to: listener.to_string(),
            });
        };
        let port = l.port;
        let groups = self
            .load_balancer(&l.load_balancer)
            .map(|lb| lb.security_groups.clone())
            .unwrap_or_default();

        for group in &groups {
            self.add_ingress_rule(group, IngressRule::tcp(Cidr::any_ipv4(), port, description))?;
        }
        Ok(())
    }

    /// VPC owning a subnet, security group, instance or target group
    fn owning_vpc(&self, id: &LogicalId) -> Option<&LogicalId> {
        match self.get(id)? {
            Resource::Subnet(s) => Some(&s.vpc),
            Resource::SecurityGroup(sg) => Some(&sg.vpc),
            Resource::Instance(i) => self.owning_vpc(&i.subnet),
            Resource::TargetGroup(tg) => Some(&tg.vpc),
            Resource::LoadBalancer(lb) => Some(&lb.vpc),
            _ => None,
        }
    }

    fn same_vpc(&self, from: &LogicalId, vpc: &LogicalId, other: &LogicalId) -> Result<()> {
        match self.owning_vpc(other) {
            Some(v) if v == vpc => Ok(()),
            _ => Err(StackError::InvalidConfig(format!(
                "'{}' is in VPC '{}' but '{}' is not",
                from, vpc, other
            ))),
        }
    }

    /// Kind-specific invariants; references are already resolved
    fn check(&self, id: &LogicalId, resource: &Resource) -> Result<()> {
        match resource {
            Resource::Vpc(vpc) => {
                if vpc.max_azs == 0 {
                    return Err(StackError::InvalidConfig(format!(
                        "VPC '{}' needs max_azs of at least 1",
                        id
                    )));
                }
                Ok(())
            }
            Resource::Subnet(subnet) => self.check_subnet(id, subnet),
            Resource::InternetGateway(_) => Ok(()),
            Resource::GatewayAttachment(attachment) => {
                let taken = self.iter().find_map(|(other, r)| match r {
                    Resource::GatewayAttachment(a)
                        if a.internet_gateway == attachment.internet_gateway
                            || a.vpc == attachment.vpc =>
                    {
                        Some(other)
                    }
                    _ => None,
                });
                match taken {
                    Some(other) => Err(StackError::InvalidConfig(format!(
                        "'{}': internet gateway or VPC is already attached by '{}'",
                        id, other
                    ))),
                    None => Ok(()),
                }
            }
            Resource::Route(route) => self.check_route(id, route),
            Resource::NatGateway(nat) => {
                let subnet = self.subnet(&nat.subnet).ok_or_else(|| {
                    StackError::UnknownReference {
                        from: id.to_string(),
                        to: nat.subnet.to_string(),
                    }
                })?;
                if !subnet.is_public() {
                    return Err(StackError::InvalidConfig(format!(
                        "NAT gateway '{}' must be placed in a public subnet, '{}' is private",
                        id, nat.subnet
                    )));
                }
                Ok(())
            }
            Resource::SecurityGroup(sg) => {
                if sg.group_name.trim().is_empty() {
                    return Err(StackError::InvalidConfig(format!(
                        "security group '{}' needs a name",
                        id
                    )));
                }
                Ok(())
            }
            Resource::Instance(instance) => {
                let vpc = self
                    .owning_vpc(&instance.subnet)
                    .cloned()
                    .ok_or_else(|| StackError::UnknownReference {
                        from: id.to_string(),
                        to: instance.subnet.to_string(),
                    })?;
                self.same_vpc(id, &vpc, &instance.security_group)
            }
            Resource::TargetGroup(tg) => self.check_target_group(id, tg),
            Resource::LoadBalancer(lb) => self.check_load_balancer(id, lb),
            Resource::Listener(listener) => self.check_listener(id, listener),
        }
    }

    fn check_subnet(&self, id: &LogicalId, subnet: &Subnet) -> Result<()> {
        let vpc = self
            .vpc(&subnet.vpc)
            .ok_or_else(|| StackError::UnknownReference {
                from: id.to_string(),
                to: subnet.vpc.to_string(),
            })?;

        if !vpc.cidr.contains(&subnet.cidr) {
            return Err(StackError::CidrNotContained {
                subnet: id.to_string(),
                cidr: subnet.cidr.to_string(),
                vpc: subnet.vpc.to_string(),
                vpc_cidr: vpc.cidr.to_string(),
            });
        }

        let mut zones: BTreeSet<&str> = BTreeSet::new();
        zones.insert(subnet.availability_zone.as_str());
        for (other_id, other) in self.iter() {
            let Resource::Subnet(other) = other else {
                continue;
            };
            if other.vpc != subnet.vpc {
                continue;
            }
            if other.cidr.overlaps(&subnet.cidr) {
                return Err(StackError::CidrOverlap {
                    subnet: id.to_string(),
                    cidr: subnet.cidr.to_string(),
                    other: other_id.to_string(),
                    other_cidr: other.cidr.to_string(),
                });
            }
            zones.insert(other.availability_zone.as_str());
        }

        if zones.len() > vpc.max_azs as usize {
            return Err(StackError::InvalidConfig(format!(
                "subnet '{}' would spread VPC '{}' over {} availability zones (max {})",
                id,
                subnet.vpc,
                zones.len(),
                vpc.max_azs
            )));
        }
        Ok(())
    }

    fn check_route(&self, id: &LogicalId, route: &Route) -> Result<()> {
        let subnet = self
            .subnet(&route.subnet)
            .ok_or_else(|| StackError::UnknownReference {
                from: id.to_string(),
                to: route.subnet.to_string(),
            })?;

        if route.is_default() && !self.default_routes(&route.subnet).is_empty() {
            return Err(StackError::DuplicateDefaultRoute(route.subnet.to_string()));
        }

        match &route.target {
            RouteTarget::InternetGateway(igw) => {
                if !subnet.is_public() {
                    return Err(StackError::InvalidConfig(format!(
                        "route '{}': private subnet '{}' cannot route through internet gateway '{}'",
                        id, route.subnet, igw
                    )));
                }
                let attached = route.depends_on.iter().any(|dep| {
                    matches!(
                        self.get(dep),
                        Some(Resource::GatewayAttachment(a))
                            if &a.internet_gateway == igw && a.vpc == subnet.vpc
                    )
                });
                if !attached {
                    return Err(StackError::InvalidConfig(format!(
                        "route '{}' must depend on the attachment of '{}' to VPC '{}'",
                        id, igw, subnet.vpc
                    )));
                }
            }
            RouteTarget::NatGateway(nat) => {
                if subnet.is_public() {
                    return Err(StackError::InvalidConfig(format!(
                        "route '{}': public subnet '{}' routes through the internet gateway, not NAT",
                        id, route.subnet
                    )));
                }
                let nat_vpc = match self.get(nat) {
                    Some(Resource::NatGateway(n)) => self.owning_vpc(&n.subnet),
                    _ => None,
                };
                if nat_vpc != Some(&subnet.vpc) {
                    return Err(StackError::InvalidConfig(format!(
                        "route '{}': NAT gateway '{}' is not in VPC '{}'",
                        id, nat, subnet.vpc
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_target_group(&self, id: &LogicalId, tg: &TargetGroup) -> Result<()> {
        if tg.name.is_empty()
            || tg.name.len() > MAX_TARGET_GROUP_NAME_LEN
            || !tg.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            || tg.name.starts_with('-')
            || tg.name.ends_with('-')
        {
            return Err(StackError::InvalidConfig(format!(
                "target group '{}': name '{}' must be 1-{} alphanumerics or hyphens, not starting or ending with a hyphen",
                id, tg.name, MAX_TARGET_GROUP_NAME_LEN
            )));
        }
        if tg.port == 0 {
            return Err(StackError::InvalidConfig(format!(
                "target group '{}' needs a port",
                id
            )));
        }

        let hc = tg.health_check;
        if !(5..=300).contains(&hc.interval_secs) {
            return Err(StackError::InvalidConfig(format!(
                "target group '{}': health check interval {}s must be within 5-300s",
                id, hc.interval_secs
            )));
        }
        if hc.timeout_secs < MIN_HEALTH_CHECK_TIMEOUT_SECS || hc.timeout_secs >= hc.interval_secs {
            return Err(StackError::InvalidConfig(format!(
                "target group '{}': health check timeout {}s must be at least {}s and below the {}s interval",
                id, hc.timeout_secs, MIN_HEALTH_CHECK_TIMEOUT_SECS, hc.interval_secs
            )));
        }

        let mut seen = BTreeSet::new();
        for target in &tg.targets {
            if !seen.insert(target) {
                return Err(StackError::InvalidConfig(format!(
                    "target group '{}' lists '{}' twice",
                    id, target
                )));
            }
            self.same_vpc(id, &tg.vpc, target)?;
        }
        Ok(())
    }

    fn check_load_balancer(&self, id: &LogicalId, lb: &LoadBalancer) -> Result<()> {
        let mut zones = BTreeSet::new();
        for subnet_id in &lb.subnets {
            self.same_vpc(id, &lb.vpc, subnet_id)?;
            let Some(subnet) = self.subnet(subnet_id) else {
                continue;
            };
            if lb.internet_facing && !subnet.is_public() {
                return Err(StackError::InvalidConfig(format!(
                    "internet-facing load balancer '{}' cannot use private subnet '{}'",
                    id, subnet_id
                )));
            }
            if !zones.insert(subnet.availability_zone.as_str()) {
                return Err(StackError::InvalidConfig(format!(
                    "load balancer '{}' has more than one subnet in {}",
                    id, subnet.availability_zone
                )));
            }
        }
        if zones.len() < 2 {
            return Err(StackError::InvalidConfig(format!(
                "load balancer '{}' needs subnets in at least two availability zones",
                id
            )));
        }
        for group in &lb.security_groups {
            self.same_vpc(id, &lb.vpc, group)?;
        }
        Ok(())
    }

    fn check_listener(&self, id: &LogicalId, listener: &Listener) -> Result<()> {
        if listener.port == 0 {
            return Err(StackError::InvalidConfig(format!(
                "listener '{}' needs a port",
                id
            )));
        }
        if listener.default_target_groups.is_empty() {
            return Err(StackError::InvalidConfig(format!(
                "listener '{}' must forward to at least one target group",
                id
            )));
        }

        let port_taken = self.iter().any(|(_, r)| {
            matches!(r, Resource::Listener(l)
                if l.load_balancer == listener.load_balancer && l.port == listener.port)
        });
        if port_taken {
            return Err(StackError::InvalidConfig(format!(
                "load balancer '{}' already listens on port {}",
                listener.load_balancer, listener.port
            )));
        }

        let vpc = self
            .owning_vpc(&listener.load_balancer)
            .cloned()
            .ok_or_else(|| StackError::UnknownReference {
                from: id.to_string(),
                to: listener.load_balancer.to_string(),
            })?;
        for group in &listener.default_target_groups {
            self.same_vpc(id, &vpc, group)?;
        }
        Ok(())
    }
}
