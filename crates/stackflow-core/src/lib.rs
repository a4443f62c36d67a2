//! stackflow core
//!
//! Declares cloud infrastructure as a typed resource graph and synthesizes it
//! into a template a provisioning engine can deploy.
//!
//! ```text
//! NamingConfig ──▶ blueprint ──▶ Stack ──▶ synthesize ──▶ Template
//!  (env vars)                   (graph,       (JSON, {"Resources": ...})
//!                                validated
//!                                on add)
//! ```
//!
//! The stack never talks to a cloud API. Diffing, ordering and rollback are
//! the engine's job; this crate only guarantees that every reference in the
//! graph points at an earlier declaration, that names are unique, and that
//! the address plan is consistent.

pub mod blueprint;
pub mod cidr;
pub mod error;
pub mod model;
pub mod naming;
pub mod stack;
pub mod synth;

// Re-exports
pub use blueprint::{StackVariant, alb_sample_stack, empty_stack};
pub use cidr::Cidr;
pub use error::{Result, StackError};
pub use model::{LogicalId, Resource, ResourceKind};
pub use naming::NamingConfig;
pub use stack::{Stack, StackEntry};
pub use synth::{Template, TemplateResource, synthesize};
