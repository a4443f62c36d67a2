//! On-disk cloud assembly
//!
//! Writes `manifest.json` and one `<stack>.template.json` per stack into an
//! output directory that a deployment tool picks up.

use crate::assembly::{AssemblyManifest, CloudAssembly, MANIFEST_FILE};
use crate::engine::{ProvisioningEngine, ReadyStatus, Submission, SubmittedStack};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use stackflow_core::Template;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;

pub const DEFAULT_OUT_DIR: &str = "stack.out";
pub const OUT_DIR_ENV: &str = "STACKFLOW_OUT_DIR";
const BACKUP_SUFFIX: &str = ".backup";

/// Engine that writes the assembly to a directory
pub struct AssemblyDirectory {
    out_dir: PathBuf,
}

impl AssemblyDirectory {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    /// Output directory from `STACKFLOW_OUT_DIR`, else `stack.out`;
    /// relative paths resolve against `project_root`
    pub fn from_env(project_root: impl AsRef<Path>) -> Self {
        let dir = std::env::var(OUT_DIR_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));
        Self::new(project_root.as_ref().join(dir))
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn manifest_path(&self) -> PathBuf {
        self.out_dir.join(MANIFEST_FILE)
    }

    fn template_path(&self, template_file: &str) -> PathBuf {
        self.out_dir.join(template_file)
    }

    fn backup_path(&self, template_file: &str) -> PathBuf {
        self.out_dir
            .join(format!("{}{}", template_file, BACKUP_SUFFIX))
    }

    /// Ensure the output directory exists
    async fn ensure_out_dir(&self) -> Result<()> {
        if !self.out_dir.exists() {
            fs::create_dir_all(&self.out_dir).await?;
            tracing::debug!("Created output directory: {}", self.out_dir.display());
        }
        Ok(())
    }

    /// Write a template, keeping the previous one as a backup
    async fn write_template(&self, template_file: &str, template: &Template) -> Result<PathBuf> {
        let path = self.template_path(template_file);
        let backup = self.backup_path(template_file);

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Backed up previous template: {}", backup.display());
        }

        let content = template.to_json_pretty()?;
        fs::write(&path, content).await?;
        Ok(path)
    }

    /// Write every stack template and the manifest
    pub async fn write(&self, assembly: &CloudAssembly) -> Result<Vec<PathBuf>> {
        self.ensure_out_dir().await?;

        let mut written = Vec::with_capacity(assembly.stacks.len() + 1);
        for artifact in &assembly.stacks {
            let path = self
                .write_template(&artifact.template_file, &artifact.template)
                .await?;
            tracing::info!(
                stack = %artifact.stack_name,
                resources = artifact.template.len(),
                "Wrote {}",
                path.display()
            );
            written.push(path);
        }

        let manifest = serde_json::to_string_pretty(&assembly.manifest())?;
        fs::write(self.manifest_path(), manifest).await?;
        written.push(self.manifest_path());

        Ok(written)
    }

    /// Load the manifest, if an assembly was written before
    pub async fn read_manifest(&self) -> Result<Option<AssemblyManifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            tracing::debug!("Manifest not found at {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let manifest: AssemblyManifest = serde_json::from_str(&content)?;
        Ok(Some(manifest))
    }

    /// Load a written template by stack name
    pub async fn read_template(&self, stack_name: &str) -> Result<Template> {
        let manifest = self.read_manifest().await?.ok_or_else(|| {
            EngineError::AssemblyError(format!(
                "no assembly in {}",
                self.out_dir.display()
            ))
        })?;
        let entry = manifest
            .artifacts
            .iter()
            .find(|a| a.stack_name == stack_name)
            .ok_or_else(|| {
                EngineError::AssemblyError(format!("stack '{}' is not in the assembly", stack_name))
            })?;

        let content = fs::read_to_string(self.template_path(&entry.template_file)).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl ProvisioningEngine for AssemblyDirectory {
    fn name(&self) -> &str {
        "assembly-dir"
    }

    fn display_name(&self) -> &str {
        "Cloud assembly directory"
    }

    async fn check_ready(&self) -> Result<ReadyStatus> {
        if self.out_dir.exists() && !self.out_dir.is_dir() {
            return Ok(ReadyStatus::failed(format!(
                "{} exists and is not a directory",
                self.out_dir.display()
            )));
        }
        Ok(ReadyStatus::ok(self.out_dir.display().to_string()))
    }

    async fn submit(&self, assembly: &CloudAssembly) -> Result<Submission> {
        let status = self.check_ready().await?;
        if !status.ready {
            return Err(EngineError::NotReady(status.error.unwrap_or_default()));
        }

        let start = Instant::now();
        self.write(assembly).await?;

        let mut submission = Submission::new(self.name());
        for artifact in &assembly.stacks {
            submission.stacks.push(SubmittedStack {
                stack_name: artifact.stack_name.clone(),
                resources: artifact.template.len(),
                location: self
                    .template_path(&artifact.template_file)
                    .display()
                    .to_string(),
            });
        }
        submission.duration_ms = start.elapsed().as_millis() as u64;
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackflow_core::NamingConfig;
    use tempfile::tempdir;

    fn sample_assembly() -> CloudAssembly {
        let stack =
            stackflow_core::alb_sample_stack("CdkSampleTsStack", &NamingConfig::default()).unwrap();
        CloudAssembly::new().with_stack(&stack).unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let temp_dir = tempdir().unwrap();
        let dir = AssemblyDirectory::new(temp_dir.path().join("out"));
        let assembly = sample_assembly();

        let written = dir.write(&assembly).await.unwrap();
        assert_eq!(written.len(), 2);
        assert!(temp_dir.path().join("out/CdkSampleTsStack.template.json").exists());

        let manifest = dir.read_manifest().await.unwrap().unwrap();
        assert_eq!(manifest.artifacts.len(), 1);
        assert_eq!(manifest.artifacts[0].stack_name, "CdkSampleTsStack");

        let template = dir.read_template("CdkSampleTsStack").await.unwrap();
        assert_eq!(template, assembly.stacks[0].template);
    }

    #[tokio::test]
    async fn test_rewrite_creates_backup() {
        let temp_dir = tempdir().unwrap();
        let dir = AssemblyDirectory::new(temp_dir.path());
        let assembly = sample_assembly();

        dir.write(&assembly).await.unwrap();
        dir.write(&assembly).await.unwrap();

        let current =
            std::fs::read_to_string(temp_dir.path().join("CdkSampleTsStack.template.json")).unwrap();
        let backup =
            std::fs::read_to_string(temp_dir.path().join("CdkSampleTsStack.template.json.backup"))
                .unwrap();
        assert_eq!(current, backup);
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let temp_dir = tempdir().unwrap();
        let dir = AssemblyDirectory::new(temp_dir.path());

        assert!(dir.read_manifest().await.unwrap().is_none());
        assert!(matches!(
            dir.read_template("Missing").await,
            Err(EngineError::AssemblyError(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_reports_stacks() {
        let temp_dir = tempdir().unwrap();
        let dir = AssemblyDirectory::new(temp_dir.path().join("assembly"));

        let submission = dir.submit(&sample_assembly()).await.unwrap();
        assert_eq!(submission.engine, "assembly-dir");
        assert_eq!(submission.stacks.len(), 1);
        assert!(submission.total_resources() > 0);
        assert!(submission.stacks[0].location.ends_with("CdkSampleTsStack.template.json"));
    }

    #[tokio::test]
    async fn test_not_ready_when_path_is_a_file() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("taken");
        std::fs::write(&file, "x").unwrap();
        let dir = AssemblyDirectory::new(&file);

        assert!(!dir.check_ready().await.unwrap().ready);
        assert!(matches!(
            dir.submit(&sample_assembly()).await,
            Err(EngineError::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_stack_name_cannot_leave_out_dir() {
        let temp_dir = tempdir().unwrap();
        let out = temp_dir.path().join("out");

        let result = CloudAssembly::new().with_stack(&stackflow_core::empty_stack("../escaped"));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));

        let dir = AssemblyDirectory::new(&out);
        dir.write(&CloudAssembly::new()).await.unwrap();
        assert!(!temp_dir.path().join("escaped.template.json").exists());
        assert!(out.join(MANIFEST_FILE).exists());
    }

    #[test]
    fn test_out_dir_from_env() {
        temp_env::with_var(OUT_DIR_ENV, Some("custom"), || {
            let dir = AssemblyDirectory::from_env("/project");
            assert_eq!(dir.out_dir(), Path::new("/project/custom"));
        });
        temp_env::with_var(OUT_DIR_ENV, None::<&str>, || {
            let dir = AssemblyDirectory::from_env("/project");
            assert_eq!(dir.out_dir(), Path::new("/project/stack.out"));
        });
    }
}
