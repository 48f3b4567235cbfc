//! Error types for the model crate

use thiserror::Error;

/// Errors raised while validating, evaluating or serializing a model
#[derive(Error, Debug)]
pub enum ModelError {
    /// Model structure is inconsistent
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    /// No tree produced a vote for the input
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    /// Canonical serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
