//! Error types for the tuner and the verification harness.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error on line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("Column `{0}` not found")]
    MissingColumn(String),

    #[error("Invalid label {value} in column `{column}` (row {row})")]
    InvalidLabel {
        column: String,
        row: usize,
        value: f32,
    },

    #[error("Size mismatch between {a} and {b}: got {got}, expected {expected}")]
    ShapeMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Invalid layer: {0}")]
    InvalidLayer(String),

    #[error("Invalid search space: {0}")]
    InvalidSearchSpace(String),

    #[error("Unknown hyperparameter `{0}`")]
    UnknownHyperparameter(String),

    #[error("The search finished without any completed trial")]
    NoCompletedTrials,

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Verification failed for: {}", .0.join(", "))]
    Verification(Vec<String>),
}

impl Error {
    pub fn csv(line: usize, message: impl Into<String>) -> Self {
        Self::Csv {
            line,
            message: message.into(),
        }
    }

    pub fn search_space(msg: impl Into<String>) -> Self {
        Self::InvalidSearchSpace(msg.into())
    }
}
