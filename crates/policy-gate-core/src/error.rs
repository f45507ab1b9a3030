//! Domain-level error taxonomy for policy-gate.

use std::path::PathBuf;

/// policy-gate domain errors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("invalid policy config: {0}")]
    Config(String),

    #[error("no package declaration found in {}", .0.display())]
    MissingPackage(PathBuf),

    #[error("policy engine error: {0}")]
    Engine(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for policy-gate domain operations.
pub type Result<T> = std::result::Result<T, GateError>;
