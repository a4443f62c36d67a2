//! Template synthesis
//!
//! Turns a [`Stack`] into a CloudFormation-compatible template. Keys are kept
//! in sorted maps, so synthesizing the same declaration always yields the same
//! bytes.

use crate::model::*;
use crate::stack::Stack;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Synthesized template: `{"Resources": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, TemplateResource>,
}

/// One entry under `Resources`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    #[serde(rename = "DependsOn", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl TemplateResource {
    fn new(resource_type: &str, properties: Value) -> Self {
        let properties = match properties {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            resource_type: resource_type.to_string(),
            properties,
            depends_on: Vec::new(),
        }
    }

    fn depends_on(mut self, keys: Vec<String>) -> Self {
        self.depends_on = keys;
        self.depends_on.sort();
        self.depends_on.dedup();
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

impl Template {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TemplateResource> {
        self.resources.get(key)
    }

    /// Keys of every resource of a CloudFormation type
    pub fn keys_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn reference(id: &LogicalId) -> Value {
    json!({ "Ref": id.template_key() })
}

fn get_att(key: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [key, attribute] })
}

fn route_table_key(subnet: &LogicalId) -> String {
    format!("{}RouteTable", subnet.template_key())
}

fn name_tag(value: &str) -> Value {
    json!([{ "Key": "Name", "Value": value }])
}

/// Template keys of the default routes leaving `subnets`
fn default_route_keys<'a>(
    stack: &Stack,
    subnets: impl IntoIterator<Item = &'a LogicalId>,
) -> Vec<String> {
    subnets
        .into_iter()
        .flat_map(|subnet| stack.default_routes(subnet))
        .map(|(id, _)| id.template_key())
        .collect()
}

/// Synthesize the template for a stack
pub fn synthesize(stack: &Stack) -> Template {
    let mut template = Template::default();

    for (id, resource) in stack.iter() {
        let key = id.template_key();
        let path = format!("{}/{}", stack.name(), id);

        match resource {
            Resource::Vpc(vpc) => {
                let name = vpc.name.clone().unwrap_or_else(|| path.clone());
                template.resources.insert(
                    key,
                    TemplateResource::new(
                        ResourceKind::Vpc.cfn_type(),
                        json!({
                            "CidrBlock": vpc.cidr.to_string(),
                            "EnableDnsHostnames": vpc.enable_dns_hostnames,
                            "EnableDnsSupport": vpc.enable_dns_support,
                            "InstanceTenancy": "default",
                            "Tags": name_tag(&name),
                        }),
                    ),
                );
            }
            Resource::Subnet(subnet) => {
                template.resources.insert(
                    key.clone(),
                    TemplateResource::new(
                        ResourceKind::Subnet.cfn_type(),
                        json!({
                            "VpcId": reference(&subnet.vpc),
                            "AvailabilityZone": subnet.availability_zone,
                            "CidrBlock": subnet.cidr.to_string(),
                            "MapPublicIpOnLaunch": subnet.map_public_ip_on_launch,
                            "Tags": [
                                { "Key": "Name", "Value": path },
                                { "Key": "stackflow:subnet-type", "Value": subnet.kind.to_string() },
                            ],
                        }),
                    ),
                );
                template.resources.insert(
                    route_table_key(id),
                    TemplateResource::new(
                        "AWS::EC2::RouteTable",
                        json!({
                            "VpcId": reference(&subnet.vpc),
                            "Tags": name_tag(&path),
                        }),
                    ),
                );
                template.resources.insert(
                    format!("{}Association", route_table_key(id)),
                    TemplateResource::new(
                        "AWS::EC2::SubnetRouteTableAssociation",
                        json!({
                            "RouteTableId": { "Ref": route_table_key(id) },
                            "SubnetId": { "Ref": key },
                        }),
                    ),
                );
            }
            Resource::InternetGateway(_) => {
                template.resources.insert(
                    key,
                    TemplateResource::new(
                        ResourceKind::InternetGateway.cfn_type(),
                        json!({ "Tags": name_tag(&path) }),
                    ),
                );
            }
            Resource::GatewayAttachment(attachment) => {
                template.resources.insert(
                    key,
                    TemplateResource::new(
                        ResourceKind::GatewayAttachment.cfn_type(),
                        json!({
                            "VpcId": reference(&attachment.vpc),
                            "InternetGatewayId": reference(&attachment.internet_gateway),
                        }),
                    ),
                );
            }
            Resource::Route(route) => {
                let mut properties = json!({
                    "RouteTableId": { "Ref": route_table_key(&route.subnet) },
                    "DestinationCidrBlock": route.destination.to_string(),
                });
                let (target_property, target) = match &route.target {
                    RouteTarget::InternetGateway(igw) => ("GatewayId", igw),
                    RouteTarget::NatGateway(nat) => ("NatGatewayId", nat),
                };
                properties[target_property] = reference(target);

                template.resources.insert(
                    key,
                    TemplateResource::new(ResourceKind::Route.cfn_type(), properties).depends_on(
                        route.depends_on.iter().map(LogicalId::template_key).collect(),
                    ),
                );
            }
            Resource::NatGateway(nat) => {
                let eip_key = format!("{}EIP", key);
                template.resources.insert(
                    eip_key.clone(),
                    TemplateResource::new(
                        "AWS::EC2::EIP",
                        json!({ "Domain": "vpc", "Tags": name_tag(&path) }),
                    ),
                );
                // NAT traffic leaves through the public subnet's own default route
                template.resources.insert(
                    key,
                    TemplateResource::new(
                        ResourceKind::NatGateway.cfn_type(),
                        json!({
                            "AllocationId": get_att(&eip_key, "AllocationId"),
                            "SubnetId": reference(&nat.subnet),
                            "Tags": name_tag(&path),
                        }),
                    )
                    .depends_on(default_route_keys(stack, [&nat.subnet])),
                );
            }
            Resource::SecurityGroup(sg) => {
                template
                    .resources
                    .insert(key, synthesize_security_group(sg));
            }
            Resource::Instance(instance) => {
                let zone = stack
                    .subnet(&instance.subnet)
                    .map(|s| s.availability_zone.clone());
                let mut properties = json!({
                    "ImageId": instance.machine_image.image_id(),
                    "InstanceType": instance.instance_type.to_string(),
                    "SecurityGroupIds": [get_att(&instance.security_group.template_key(), "GroupId")],
                    "SubnetId": reference(&instance.subnet),
                    "Tags": name_tag(&instance.name),
                });
                if let Some(zone) = zone {
                    properties["AvailabilityZone"] = json!(zone);
                }
                if let Some(key_name) = &instance.key_name {
                    properties["KeyName"] = json!(key_name);
                }
                if let Some(user_data) = &instance.user_data {
                    properties["UserData"] = json!(BASE64.encode(user_data.render()));
                }

                // The bootstrap script needs outbound access on first boot
                template.resources.insert(
                    key,
                    TemplateResource::new(ResourceKind::Instance.cfn_type(), properties)
                        .depends_on(default_route_keys(stack, [&instance.subnet])),
                );
            }
            Resource::TargetGroup(tg) => {
                let targets: Vec<Value> = tg
                    .targets
                    .iter()
                    .map(|t| json!({ "Id": reference(t) }))
                    .collect();
                template.resources.insert(
                    key,
                    TemplateResource::new(
                        ResourceKind::TargetGroup.cfn_type(),
                        json!({
                            "HealthCheckIntervalSeconds": tg.health_check.interval_secs,
                            "HealthCheckTimeoutSeconds": tg.health_check.timeout_secs,
                            "Name": tg.name,
                            "Port": tg.port,
                            "Protocol": tg.protocol.as_str(),
                            "TargetType": "instance",
                            "Targets": targets,
                            "VpcId": reference(&tg.vpc),
                        }),
                    ),
                );
            }
            Resource::LoadBalancer(lb) => {
                let groups: Vec<Value> = lb
                    .security_groups
                    .iter()
                    .map(|g| get_att(&g.template_key(), "GroupId"))
                    .collect();
                let subnets: Vec<Value> = lb.subnets.iter().map(reference).collect();
                let mut resource = TemplateResource::new(
                    ResourceKind::LoadBalancer.cfn_type(),
                    json!({
                        "Scheme": lb.scheme(),
                        "SecurityGroups": groups,
                        "Subnets": subnets,
                        "Type": "application",
                    }),
                );
                if lb.internet_facing {
                    resource = resource.depends_on(default_route_keys(stack, &lb.subnets));
                }
                template.resources.insert(key, resource);
            }
            Resource::Listener(listener) => {
                let action = match listener.default_target_groups.as_slice() {
                    [single] => json!({ "Type": "forward", "TargetGroupArn": reference(single) }),
                    groups => {
                        let groups: Vec<Value> = groups
                            .iter()
                            .map(|g| json!({ "TargetGroupArn": reference(g) }))
                            .collect();
                        json!({ "Type": "forward", "ForwardConfig": { "TargetGroups": groups } })
                    }
                };
                template.resources.insert(
                    key,
                    TemplateResource::new(
                        ResourceKind::Listener.cfn_type(),
                        json!({
                            "DefaultActions": [action],
                            "LoadBalancerArn": reference(&listener.load_balancer),
                            "Port": listener.port,
                            "Protocol": listener.protocol.as_str(),
                        }),
                    ),
                );
            }
        }
    }

    tracing::info!(
        stack = %stack.name(),
        declared = stack.len(),
        resources = template.len(),
        "Synthesized template"
    );
    template
}

fn synthesize_security_group(sg: &SecurityGroup) -> TemplateResource {
    let ingress: Vec<Value> = sg
        .ingress
        .iter()
        .map(|rule| {
            json!({
                "CidrIp": rule.peer.to_string(),
                "Description": rule.description,
                "FromPort": rule.port,
                "IpProtocol": rule.protocol.as_str(),
                "ToPort": rule.port,
            })
        })
        .collect();

    let egress = if sg.allow_all_outbound {
        json!([{
            "CidrIp": "0.0.0.0/0",
            "Description": "Allow all outbound traffic by default",
            "IpProtocol": "-1",
        }])
    } else {
        // An empty egress list would fall back to allow-all; block with an unmatchable rule
        json!([{
            "CidrIp": "255.255.255.255/32",
            "Description": "Disallow all traffic",
            "FromPort": 252,
            "IpProtocol": "icmp",
            "ToPort": 86,
        }])
    };

    TemplateResource::new(
        ResourceKind::SecurityGroup.cfn_type(),
        json!({
            "GroupDescription": sg.description,
            "GroupName": sg.group_name,
            "SecurityGroupEgress": egress,
            "SecurityGroupIngress": ingress,
            "VpcId": reference(&sg.vpc),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cidr::Cidr;
    use pretty_assertions::assert_eq;

    fn cidr(s: &str) -> Cidr {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_stack_template() {
        let template = synthesize(&Stack::new("MyTestStack"));
        assert!(template.is_empty());
        assert_eq!(template.to_json().unwrap(), r#"{"Resources":{}}"#);
    }

    #[test]
    fn test_subnet_expands_to_route_table() {
        let mut stack = Stack::new("Net");
        let vpc = stack.add_vpc("vpc", Vpc::new(cidr("10.0.0.0/16"))).unwrap();
        stack
            .add_subnet("priv-a", Subnet::private(vpc, "az-a", cidr("10.0.10.0/24")))
            .unwrap();

        let template = synthesize(&stack);
        let keys: Vec<&str> = template.resources.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["priva", "privaRouteTable", "privaRouteTableAssociation", "vpc"]
        );
        let subnet = template.get("priva").unwrap();
        assert_eq!(subnet.resource_type, "AWS::EC2::Subnet");
        assert_eq!(subnet.property("VpcId"), Some(&json!({ "Ref": "vpc" })));
        assert_eq!(subnet.property("MapPublicIpOnLaunch"), Some(&json!(false)));
    }

    #[test]
    fn test_internet_route_depends_on_attachment() {
        let mut stack = Stack::new("Net");
        let vpc = stack.add_vpc("vpc", Vpc::new(cidr("10.0.0.0/16"))).unwrap();
        let public = stack
            .add_subnet("pub", Subnet::public(vpc.clone(), "az-a", cidr("10.0.30.0/24")))
            .unwrap();
        let igw = stack.add_internet_gateway("igw").unwrap();
        let attachment = stack.attach_internet_gateway("att", &vpc, &igw).unwrap();
        stack
            .add_default_internet_route(&public, &igw, &attachment)
            .unwrap();

        let template = synthesize(&stack);
        let route = template.get("pubDefaultRoute").unwrap();
        assert_eq!(route.depends_on, vec!["att"]);
        assert_eq!(route.property("GatewayId"), Some(&json!({ "Ref": "igw" })));
        assert_eq!(
            route.property("RouteTableId"),
            Some(&json!({ "Ref": "pubRouteTable" }))
        );
        assert_eq!(route.property("DestinationCidrBlock"), Some(&json!("0.0.0.0/0")));
    }

    #[test]
    fn test_security_group_egress() {
        let mut stack = Stack::new("Net");
        let vpc = stack.add_vpc("vpc", Vpc::new(cidr("10.0.0.0/16"))).unwrap();
        let mut closed = SecurityGroup::new(vpc.clone(), "closed", "no egress");
        closed.allow_all_outbound = false;
        stack.add_security_group("closed", closed).unwrap();
        let open = stack
            .add_security_group("open", SecurityGroup::new(vpc, "open", "egress"))
            .unwrap();
        stack
            .add_ingress_rule(&open, IngressRule::tcp(Cidr::any_ipv4(), 80, "allow public http"))
            .unwrap();

        let template = synthesize(&stack);
        let open = template.get("open").unwrap();
        assert_eq!(
            open.property("SecurityGroupIngress"),
            Some(&json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "allow public http",
                "FromPort": 80,
                "IpProtocol": "tcp",
                "ToPort": 80,
            }]))
        );
        assert_eq!(
            open.property("SecurityGroupEgress").unwrap()[0]["IpProtocol"],
            json!("-1")
        );
        let closed = template.get("closed").unwrap();
        assert_eq!(
            closed.property("SecurityGroupEgress").unwrap()[0]["Description"],
            json!("Disallow all traffic")
        );
    }

    #[test]
    fn test_template_round_trips_through_json() {
        let mut stack = Stack::new("Net");
        stack.add_vpc("vpc", Vpc::new(cidr("10.0.0.0/16"))).unwrap();
        stack.add_internet_gateway("igw").unwrap();

        let template = synthesize(&stack);
        let json = template.to_json_pretty().unwrap();
        let back: Template = serde_json::from_str(&json).unwrap();
        assert_eq!(back, template);
        // Resources without properties still carry their tags
        assert!(back.get("igw").unwrap().property("Tags").is_some());
    }
}
