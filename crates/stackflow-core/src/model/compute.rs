//! Compute instances

use super::LogicalId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instance family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceClass {
    T2,
    T3,
    M5,
    C5,
}

/// Instance size within a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceSize {
    Nano,
    Micro,
    Small,
    Medium,
    Large,
}

/// Instance type such as `t3.micro`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType {
    pub class: InstanceClass,
    pub size: InstanceSize,
}

impl InstanceType {
    pub fn of(class: InstanceClass, size: InstanceSize) -> Self {
        Self { class, size }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            InstanceClass::T2 => "t2",
            InstanceClass::T3 => "t3",
            InstanceClass::M5 => "m5",
            InstanceClass::C5 => "c5",
        };
        let size = match self.size {
            InstanceSize::Nano => "nano",
            InstanceSize::Micro => "micro",
            InstanceSize::Small => "small",
            InstanceSize::Medium => "medium",
            InstanceSize::Large => "large",
        };
        write!(f, "{}.{}", class, size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmazonLinuxGeneration {
    AmazonLinux,
    AmazonLinux2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmazonLinuxEdition {
    Standard,
    Minimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmazonLinuxVirt {
    Hvm,
    Pv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmazonLinuxStorage {
    GeneralPurpose,
    Ebs,
}

/// Machine image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MachineImage {
    /// Latest Amazon Linux, resolved from the public SSM parameter at deploy time
    LatestAmazonLinux {
        generation: AmazonLinuxGeneration,
        edition: AmazonLinuxEdition,
        virtualization: AmazonLinuxVirt,
        storage: AmazonLinuxStorage,
    },
    /// Fixed AMI id
    Ami { id: String },
}

impl MachineImage {
    pub fn amazon_linux_2() -> Self {
        MachineImage::LatestAmazonLinux {
            generation: AmazonLinuxGeneration::AmazonLinux2,
            edition: AmazonLinuxEdition::Standard,
            virtualization: AmazonLinuxVirt::Hvm,
            storage: AmazonLinuxStorage::GeneralPurpose,
        }
    }

    /// SSM parameter publishing the latest image id, if any
    pub fn ssm_parameter(&self) -> Option<String> {
        let MachineImage::LatestAmazonLinux {
            generation,
            edition,
            virtualization,
            storage,
        } = self
        else {
            return None;
        };

        let mut parts = vec![match generation {
            AmazonLinuxGeneration::AmazonLinux => "amzn",
            AmazonLinuxGeneration::AmazonLinux2 => "amzn2",
        }];
        parts.push("ami");
        if *edition == AmazonLinuxEdition::Minimal {
            parts.push("minimal");
        }
        parts.push(match virtualization {
            AmazonLinuxVirt::Hvm => "hvm",
            AmazonLinuxVirt::Pv => "pv",
        });
        parts.push("x86_64");
        parts.push(match storage {
            AmazonLinuxStorage::GeneralPurpose => "gp2",
            AmazonLinuxStorage::Ebs => "ebs",
        });

        Some(format!(
            "/aws/service/ami-amazon-linux-latest/{}",
            parts.join("-")
        ))
    }

    /// Value for the instance's `ImageId` property
    pub fn image_id(&self) -> String {
        match self {
            MachineImage::Ami { id } => id.clone(),
            image => format!(
                "{{{{resolve:ssm:{}}}}}",
                image.ssm_parameter().unwrap_or_default()
            ),
        }
    }
}

/// First-boot script
///
/// Runs once when the instance is created; it is not re-run on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub shebang: String,
    pub commands: Vec<String>,
}

impl UserData {
    /// Linux user data from a full script; a script without its own
    /// interpreter line gets `#!/bin/bash`.
    pub fn for_linux(script: &str) -> Self {
        let mut lines = script.lines();
        let shebang = if script.starts_with("#!") {
            lines.next().unwrap_or_default().to_string()
        } else {
            "#!/bin/bash".to_string()
        };
        Self {
            shebang,
            commands: lines.map(str::to_string).collect(),
        }
    }

    pub fn add_commands<I, S>(&mut self, commands: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
    }

    pub fn render(&self) -> String {
        let mut out = self.shebang.clone();
        for line in &self.commands {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}

/// Virtual machine placed in one subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub instance_type: InstanceType,
    pub machine_image: MachineImage,
    pub subnet: LogicalId,
    pub security_group: LogicalId,
    pub user_data: Option<UserData>,
    pub key_name: Option<String>,
    /// `Name` tag
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_type_display() {
        let t = InstanceType::of(InstanceClass::T3, InstanceSize::Micro);
        assert_eq!(t.to_string(), "t3.micro");
    }

    #[test]
    fn test_amazon_linux_2_parameter() {
        let image = MachineImage::amazon_linux_2();
        assert_eq!(
            image.ssm_parameter().as_deref(),
            Some("/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2")
        );
        assert_eq!(
            image.image_id(),
            "{{resolve:ssm:/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2}}"
        );
    }

    #[test]
    fn test_minimal_edition_parameter() {
        let image = MachineImage::LatestAmazonLinux {
            generation: AmazonLinuxGeneration::AmazonLinux,
            edition: AmazonLinuxEdition::Minimal,
            virtualization: AmazonLinuxVirt::Pv,
            storage: AmazonLinuxStorage::Ebs,
        };
        assert_eq!(
            image.ssm_parameter().as_deref(),
            Some("/aws/service/ami-amazon-linux-latest/amzn-ami-minimal-pv-x86_64-ebs")
        );
    }

    #[test]
    fn test_fixed_ami() {
        let image = MachineImage::Ami {
            id: "ami-0123456789".to_string(),
        };
        assert_eq!(image.ssm_parameter(), None);
        assert_eq!(image.image_id(), "ami-0123456789");
    }

    #[test]
    fn test_user_data_keeps_script_shebang() {
        let data = UserData::for_linux("#!/bin/bash -ex\necho hi\necho bye");
        assert_eq!(data.shebang, "#!/bin/bash -ex");
        assert_eq!(data.commands, vec!["echo hi", "echo bye"]);
        assert_eq!(data.render(), "#!/bin/bash -ex\necho hi\necho bye");
    }

    #[test]
    fn test_user_data_default_shebang() {
        let mut data = UserData::for_linux("echo hi");
        data.add_commands(["echo more"]);
        assert_eq!(data.render(), "#!/bin/bash\necho hi\necho more");
    }
}
