use khet_model::ModelError;
use khet_trainer::{DataLoadError, TrainingError, UnknownCategoryError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::request::InputRangeError;

/// Per-request failures. None of these touch the fitted state.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategoryError),

    #[error(transparent)]
    InputRange(#[from] InputRangeError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl RecommendError {
    /// True when the caller sent something the service cannot accept.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownCategory(_) | Self::InputRange(_))
    }
}

/// Startup failures; any of these stops the process before it serves.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("data load error: {0}")]
    DataLoad(#[from] DataLoadError),

    #[error("training error: {0}")]
    Training(#[from] TrainingError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
