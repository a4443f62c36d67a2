//! Stackflow provisioning engine handoff
//!
//! Packages validated stacks into a cloud assembly and hands it to a
//! provisioning engine. The engine owns everything after synthesis.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  stackflow CLI                   │
//! │              (stackflow deploy)                  │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               stackflow-engine                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Engine Abstraction               │   │
//! │  │  trait ProvisioningEngine { ... }         │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────────────┐     │
//! │  │   Assembly   │  │  Assembly directory  │     │
//! │  └──────────────┘  └──────────────────────┘     │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod assembly;
pub mod directory;
pub mod engine;
pub mod error;

// Re-exports
pub use assembly::{
    ASSEMBLY_VERSION, AssemblyManifest, CloudAssembly, MANIFEST_FILE, MAX_STACK_NAME_LEN,
    ManifestEntry, StackArtifact,
};
pub use directory::{AssemblyDirectory, DEFAULT_OUT_DIR, OUT_DIR_ENV};
pub use engine::{ProvisioningEngine, ReadyStatus, Submission, SubmittedStack};
pub use error::{EngineError, Result};
