//! Built-in stack declarations
//!
//! `alb_sample_stack` declares a two-AZ web tier: a VPC split into private
//! and public subnets, internet and NAT routing, two instances bootstrapped
//! with httpd, and an internet-facing ALB in front of them.

use crate::cidr::Cidr;
use crate::error::Result;
use crate::model::*;
use crate::naming::NamingConfig;
use crate::stack::Stack;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// First-boot script for the web instances
///
/// Installs httpd and writes the instance's interface addresses to the web
/// root, so a response through the load balancer shows which instance served it.
pub const WEB_SERVER_BOOTSTRAP: &str = r#"#!/bin/bash -ex
exec > >(tee /var/log/user-data.log|logger -t user-data -s 2>/dev/console) 2>&1
echo BEGIN_USERSCRIPT
date '+%Y-%m-%d %H:%M:%S'
sudo yum update -y
sudo yum install -y httpd php php-mysqld
sudo chkconfig httpd on
sudo groupadd www
sudo usermod -a -G www ec2-user
sudo chgrp -R www /var/www
sudo echo `ifconfig | grep inet` >> /var/www/html/index.html
sudo chmod 2775 /var/www
sudo service httpd start
echo END_USERSCRIPT"#;

pub const VPC_CIDR: &str = "10.0.0.0/16";
pub const ZONE_A: &str = "ap-northeast-2a";
pub const ZONE_C: &str = "ap-northeast-2c";

/// Health check timeout for the web target group; 5s proved too tight
pub const WEB_HEALTH_CHECK_TIMEOUT_SECS: u32 = 10;

pub const SSH_HTTP_GROUP_NAME: &str = "test-alb-sg-ssh-http";
pub const HTTP_GROUP_NAME: &str = "test-alb-sg-http";

/// Which declaration to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackVariant {
    /// No resources
    Empty,
    /// The full two-AZ ALB sample
    #[default]
    Full,
}

impl FromStr for StackVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empty" => Ok(StackVariant::Empty),
            "full" => Ok(StackVariant::Full),
            other => Err(format!("unknown stack variant '{}' (expected empty or full)", other)),
        }
    }
}

impl std::fmt::Display for StackVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackVariant::Empty => write!(f, "empty"),
            StackVariant::Full => write!(f, "full"),
        }
    }
}

impl StackVariant {
    pub fn build(&self, name: &str, naming: &NamingConfig) -> Result<Stack> {
        match self {
            StackVariant::Empty => Ok(empty_stack(name)),
            StackVariant::Full => alb_sample_stack(name, naming),
        }
    }
}

/// A stack with no resources
pub fn empty_stack(name: &str) -> Stack {
    Stack::new(name)
}

fn cidr(s: &str) -> Result<Cidr> {
    s.parse()
}

/// The two-AZ ALB sample
pub fn alb_sample_stack(name: &str, naming: &NamingConfig) -> Result<Stack> {
    let mut stack = Stack::new(name);

    // Subnets are declared explicitly below; the VPC itself gets none, so no
    // implicit internet gateway path is created with it.
    let vpc = stack.add_vpc(
        &naming.name("vpc"),
        Vpc::new(cidr(VPC_CIDR)?)
            .with_name(naming.name("vpc"))
            .with_max_azs(3),
    )?;

    let private_a = stack.add_subnet(
        "privatesubneta",
        Subnet::private(vpc.clone(), ZONE_A, cidr("10.0.10.0/24")?),
    )?;
    let private_c = stack.add_subnet(
        "privatesubnetc",
        Subnet::private(vpc.clone(), ZONE_C, cidr("10.0.20.0/24")?),
    )?;
    let public_a = stack.add_subnet(
        "publicsubneta",
        Subnet::public(vpc.clone(), ZONE_A, cidr("10.0.30.0/24")?),
    )?;
    let public_c = stack.add_subnet(
        "publicsubnetc",
        Subnet::public(vpc.clone(), ZONE_C, cidr("10.0.40.0/24")?),
    )?;

    let igw = stack.add_internet_gateway("cdksample-igw")?;
    let attachment = stack.attach_internet_gateway("cdksample-igw-attachment", &vpc, &igw)?;
    stack.add_default_internet_route(&public_a, &igw, &attachment)?;
    stack.add_default_internet_route(&public_c, &igw, &attachment)?;

    // yum needs outbound access from the private subnets. One NAT gateway
    // serves both zones; there is no failover if zone A goes down.
    let nat = stack.add_nat_gateway(&public_a)?;
    stack.add_default_nat_route(&private_a, &nat)?;
    stack.add_default_nat_route(&private_c, &nat)?;

    let ssh_http = stack.add_security_group(
        "sshandhttpsg",
        SecurityGroup::new(
            vpc.clone(),
            SSH_HTTP_GROUP_NAME,
            "alb test security group. It will allow ssh & http port",
        ),
    )?;
    stack.add_ingress_rule(&ssh_http, IngressRule::tcp(Cidr::any_ipv4(), 22, "allow public ssh"))?;
    stack.add_ingress_rule(&ssh_http, IngressRule::tcp(Cidr::any_ipv4(), 80, "allow public http"))?;

    let http = stack.add_security_group(
        "httpsg",
        SecurityGroup::new(
            vpc.clone(),
            HTTP_GROUP_NAME,
            "alb test security group.It will allow http port only.",
        ),
    )?;
    // TODO: confirm whether httpsg should open 80 rather than 22; port 80
    // reaches it only through the listener rule below.
    stack.add_ingress_rule(&http, IngressRule::tcp(Cidr::any_ipv4(), 22, "allow public http"))?;

    let user_data = UserData::for_linux(WEB_SERVER_BOOTSTRAP);
    let web_instance = |subnet: &LogicalId, suffix: &str| Instance {
        instance_type: InstanceType::of(InstanceClass::T3, InstanceSize::Micro),
        machine_image: MachineImage::amazon_linux_2(),
        subnet: subnet.clone(),
        security_group: ssh_http.clone(),
        user_data: Some(user_data.clone()),
        key_name: Some(naming.key_pair.clone()),
        name: naming.name(suffix),
    };
    let instance_a = stack.add_instance("insta", web_instance(&private_a, "instanceA"))?;
    let instance_c = stack.add_instance("instc", web_instance(&private_c, "instanceC"))?;

    let target_group = stack.add_target_group(
        &naming.name("albtg1"),
        TargetGroup {
            vpc: vpc.clone(),
            name: naming.name("albtg1"),
            port: 80,
            protocol: ApplicationProtocol::Http,
            targets: vec![instance_a, instance_c],
            health_check: HealthCheck::with_timeout(WEB_HEALTH_CHECK_TIMEOUT_SECS),
        },
    )?;

    let alb = stack.add_load_balancer(
        &naming.name("alb1"),
        LoadBalancer {
            vpc,
            subnets: vec![public_a, public_c],
            security_groups: vec![http],
            internet_facing: true,
        },
    )?;

    let listener = stack.add_listener(
        &naming.name("httplistener"),
        Listener {
            load_balancer: alb,
            port: 80,
            protocol: ApplicationProtocol::Http,
            default_target_groups: vec![target_group],
        },
    )?;
    stack.allow_listener_port_from_any_ipv4(&listener, "open to the world.")?;

    tracing::info!(stack = %stack.name(), resources = stack.len(), "Declared ALB sample stack");
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parse() {
        assert_eq!("EMPTY".parse::<StackVariant>(), Ok(StackVariant::Empty));
        assert_eq!("full".parse::<StackVariant>(), Ok(StackVariant::Full));
        assert!("half".parse::<StackVariant>().is_err());
        assert_eq!(StackVariant::default().to_string(), "full");
    }

    #[test]
    fn test_bootstrap_script_shape() {
        let data = UserData::for_linux(WEB_SERVER_BOOTSTRAP);
        assert_eq!(data.shebang, "#!/bin/bash -ex");
        assert!(data.commands.iter().any(|c| c.contains("yum install -y httpd")));
        assert!(data
            .commands
            .iter()
            .any(|c| c.contains("/var/www/html/index.html")));
        assert_eq!(data.commands.last().map(String::as_str), Some("echo END_USERSCRIPT"));
    }

    #[test]
    fn test_empty_variant_builds_empty_stack() {
        let stack = StackVariant::Empty
            .build("MyTestStack", &NamingConfig::default())
            .unwrap();
        assert!(stack.is_empty());
        assert_eq!(stack.name(), "MyTestStack");
    }
}
