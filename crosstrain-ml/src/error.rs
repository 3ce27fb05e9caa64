//! Error types for the crosstrain-ml crate.

use thiserror::Error;

/// Top-level error type for pipeline operations.
///
/// Every stage wraps underlying failures into one of these kinds, naming the
/// originating stage and operation in the message. Stages never recover
/// locally; errors propagate to the orchestrator, which halts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Data access error: {0}")]
    DataAccess(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Promotion error: {0}")]
    Promotion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Schema file error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PipelineError {
    pub fn data_access(msg: impl Into<String>) -> Self {
        Self::DataAccess(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn promotion(msg: impl Into<String>) -> Self {
        Self::Promotion(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
