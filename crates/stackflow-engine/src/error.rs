//! Engine handoff error types

use thiserror::Error;

/// Errors raised while packaging or submitting a cloud assembly
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine not ready: {0}")]
    NotReady(String),

    #[error("Stack rejected: {0}")]
    Stack(#[from] stackflow_core::StackError),

    #[error("Assembly error: {0}")]
    AssemblyError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
