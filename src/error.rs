//! Error types for RunForge

use thiserror::Error;

/// Result type alias for RunForge operations
pub type Result<T> = std::result::Result<T, RunForgeError>;

/// Main error type for the RunForge orchestrator
#[derive(Error, Debug)]
pub enum RunForgeError {
    #[error("Unknown profile: '{name}'. Available profiles: {}", .available.join(", "))]
    UnknownProfile { name: String, available: Vec<String> },

    #[error("Unknown parameter '{name}' for model '{model_family}'. Valid parameters: {}", .valid.join(", "))]
    UnknownParam {
        name: String,
        model_family: String,
        valid: Vec<String>,
    },

    #[error("Cannot parse '{name}={value}': expected {expected}")]
    TypeParseError {
        name: String,
        value: String,
        expected: String,
    },

    #[error("Invalid value for '{name}': {value}. {constraint}")]
    RangeError {
        name: String,
        value: String,
        constraint: String,
    },

    #[error("Unknown model family: {model_family}")]
    UnknownModelFamily { model_family: String },

    #[error("Unsupported model: '{model_family}'. Valid options: {}", .supported.join(", "))]
    UnsupportedModel {
        model_family: String,
        supported: Vec<String>,
    },

    #[error("Invalid --param '{param}': {reason}")]
    ParamParseError { param: String, reason: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Failed to load artifact: {0}")]
    ArtifactLoadError(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RunForgeError {
    /// True for the validator's error family (unknown name, bad type, out of range).
    pub fn is_hyperparam_error(&self) -> bool {
        matches!(
            self,
            RunForgeError::UnknownParam { .. }
                | RunForgeError::TypeParseError { .. }
                | RunForgeError::RangeError { .. }
        )
    }
}

impl From<polars::error::PolarsError> for RunForgeError {
    fn from(err: polars::error::PolarsError) -> Self {
        RunForgeError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for RunForgeError {
    fn from(err: serde_json::Error) -> Self {
        RunForgeError::SerializationError(err.to_string())
    }
}
