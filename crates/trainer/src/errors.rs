use std::path::PathBuf;
use thiserror::Error;

/// Errors returned when fitting straight from a file.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(#[from] DataLoadError),

    #[error("training error: {0}")]
    Training(#[from] TrainingError),
}

/// Errors raised while reading the training dataset.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to open training data {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("line {line}, column `{column}`: invalid number `{value}`")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("line {line}, column `{column}`: empty value")]
    EmptyValue { line: u64, column: &'static str },

    #[error("dataset has no rows")]
    Empty,
}

/// Errors raised while fitting the classifier.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("feature/label count mismatch: {features} feature rows, {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("cannot train on an empty dataset")]
    Empty,

    #[error("need at least 2 distinct labels, found {0}")]
    TooFewClasses(usize),

    #[error("invalid training parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategoryError),
}

/// A category string that was not seen when the encoder was fitted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {category} `{value}`")]
pub struct UnknownCategoryError {
    pub category: String,
    pub value: String,
}
