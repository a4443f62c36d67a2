//! Cloud assembly: what gets handed to the provisioning engine
//!
//! An assembly bundles one synthesized template per stack together with a
//! manifest the engine reads first.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackflow_core::{Stack, Template, synthesize};

pub const ASSEMBLY_VERSION: u32 = 1;
pub const MANIFEST_FILE: &str = "manifest.json";
pub const MAX_STACK_NAME_LEN: usize = 128;

/// CloudFormation stack name: a letter, then letters, digits or hyphens
fn is_valid_stack_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
        && name.len() <= MAX_STACK_NAME_LEN
}

/// A stack ready for deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackArtifact {
    /// Stack name
    pub stack_name: String,

    /// File name of the template inside the assembly
    pub template_file: String,

    /// Number of declared resources (before expansion)
    pub declared: usize,

    /// Synthesized template
    pub template: Template,
}

impl StackArtifact {
    /// Validate and synthesize a stack
    pub fn from_stack(stack: &Stack) -> Result<Self> {
        if !is_valid_stack_name(stack.name()) {
            return Err(EngineError::InvalidConfig(format!(
                "stack name '{}' must start with a letter and contain only letters, digits or hyphens (max {})",
                stack.name(),
                MAX_STACK_NAME_LEN
            )));
        }
        stack.validate()?;

        Ok(Self {
            stack_name: stack.name().to_string(),
            template_file: format!("{}.template.json", stack.name()),
            declared: stack.len(),
            template: synthesize(stack),
        })
    }
}

/// Set of stacks handed to the engine in one go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudAssembly {
    /// Assembly format version
    pub version: u32,

    /// When the assembly was built
    pub created_at: DateTime<Utc>,

    /// Stacks in declaration order
    pub stacks: Vec<StackArtifact>,
}

impl Default for CloudAssembly {
    fn default() -> Self {
        Self {
            version: ASSEMBLY_VERSION,
            created_at: Utc::now(),
            stacks: Vec::new(),
        }
    }
}

impl CloudAssembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stack; stack names are unique within an assembly
    pub fn add_stack(&mut self, stack: &Stack) -> Result<&StackArtifact> {
        if self.get(stack.name()).is_some() {
            return Err(EngineError::AssemblyError(format!(
                "stack '{}' is already in the assembly",
                stack.name()
            )));
        }
        let artifact = StackArtifact::from_stack(stack)?;
        tracing::debug!(
            stack = %artifact.stack_name,
            resources = artifact.template.len(),
            "Added stack to assembly"
        );
        self.stacks.push(artifact);
        Ok(&self.stacks[self.stacks.len() - 1])
    }

    pub fn with_stack(mut self, stack: &Stack) -> Result<Self> {
        self.add_stack(stack)?;
        Ok(self)
    }

    pub fn get(&self, stack_name: &str) -> Option<&StackArtifact> {
        self.stacks.iter().find(|s| s.stack_name == stack_name)
    }

    pub fn manifest(&self) -> AssemblyManifest {
        AssemblyManifest {
            version: self.version,
            created_at: self.created_at,
            artifacts: self
                .stacks
                .iter()
                .map(|s| ManifestEntry {
                    stack_name: s.stack_name.clone(),
                    template_file: s.template_file.clone(),
                    resources: s.template.len(),
                })
                .collect(),
        }
    }
}

/// Index of an assembly directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyManifest {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub artifacts: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub stack_name: String,
    pub template_file: String,
    pub resources: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackflow_core::NamingConfig;

    #[test]
    fn test_assembly_with_stacks() {
        let sample = stackflow_core::alb_sample_stack("Sample", &NamingConfig::default()).unwrap();
        let assembly = CloudAssembly::new()
            .with_stack(&stackflow_core::empty_stack("Empty"))
            .unwrap()
            .with_stack(&sample)
            .unwrap();

        assert_eq!(assembly.stacks.len(), 2);
        assert!(assembly.get("Empty").unwrap().template.is_empty());
        assert_eq!(assembly.get("Sample").unwrap().template_file, "Sample.template.json");

        let manifest = assembly.manifest();
        assert_eq!(manifest.version, ASSEMBLY_VERSION);
        assert_eq!(manifest.artifacts[0].resources, 0);
        assert!(manifest.artifacts[1].resources > sample.len());
    }

    #[test]
    fn test_duplicate_stack_rejected() {
        let mut assembly = CloudAssembly::new();
        assembly.add_stack(&stackflow_core::empty_stack("Twice")).unwrap();
        let err = assembly
            .add_stack(&stackflow_core::empty_stack("Twice"))
            .unwrap_err();
        assert!(matches!(err, EngineError::AssemblyError(_)));
    }

    #[test]
    fn test_stack_name_rules() {
        let too_long = format!("S{}", "a".repeat(MAX_STACK_NAME_LEN));
        for name in ["", "../escaped", "nested/stack", "1stack", "my_stack", too_long.as_str()] {
            let err = StackArtifact::from_stack(&stackflow_core::empty_stack(name)).unwrap_err();
            assert!(matches!(err, EngineError::InvalidConfig(_)), "{name:?}");
        }

        let longest = format!("S{}", "a".repeat(MAX_STACK_NAME_LEN - 1));
        for name in ["CdkSampleTsStack", "alb-stack-2", longest.as_str()] {
            assert!(StackArtifact::from_stack(&stackflow_core::empty_stack(name)).is_ok(), "{name}");
        }
    }
}
