//! Provisioning engine trait definition

use crate::assembly::CloudAssembly;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provisioning engine abstraction
///
/// An engine takes a synthesized assembly and owns everything after that:
/// diffing against deployed state, ordering API calls, retries and rollback.
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Returns the engine name (e.g., "assembly-dir")
    fn name(&self) -> &str;

    /// Returns the engine display name for UI
    fn display_name(&self) -> &str;

    /// Check that the engine can accept an assembly
    async fn check_ready(&self) -> Result<ReadyStatus>;

    /// Hand the assembly over
    async fn submit(&self, assembly: &CloudAssembly) -> Result<Submission>;
}

/// Readiness of an engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyStatus {
    /// Whether the engine accepts submissions
    pub ready: bool,

    /// Where submissions go, if known
    pub detail: Option<String>,

    /// Error message if not ready
    pub error: Option<String>,
}

impl ReadyStatus {
    pub fn ok(detail: impl Into<String>) -> Self {
        Self {
            ready: true,
            detail: Some(detail.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ready: false,
            detail: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of handing an assembly to an engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Engine that accepted the assembly
    pub engine: String,

    /// Per-stack results
    pub stacks: Vec<SubmittedStack>,

    /// Total time in milliseconds
    pub duration_ms: u64,
}

impl Submission {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            stacks: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn total_resources(&self) -> usize {
        self.stacks.iter().map(|s| s.resources).sum()
    }
}

/// One stack inside a submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedStack {
    pub stack_name: String,

    /// Resources in the synthesized template
    pub resources: usize,

    /// Where the engine put the template
    pub location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_status() {
        let ok = ReadyStatus::ok("stack.out");
        assert!(ok.ready);
        assert_eq!(ok.detail.as_deref(), Some("stack.out"));

        let failed = ReadyStatus::failed("not a directory");
        assert!(!failed.ready);
        assert_eq!(failed.error.as_deref(), Some("not a directory"));
    }

    #[test]
    fn test_submission_totals() {
        let mut submission = Submission::new("assembly-dir");
        submission.stacks.push(SubmittedStack {
            stack_name: "A".to_string(),
            resources: 3,
            location: "a".to_string(),
        });
        submission.stacks.push(SubmittedStack {
            stack_name: "B".to_string(),
            resources: 0,
            location: "b".to_string(),
        });
        assert_eq!(submission.total_resources(), 3);
    }
}
