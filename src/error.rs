//! Error types for Stepwise
//!
//! The validation and classification core never fails; these errors only surface
//! from the outer layers (transcript parsing, configuration loading, snapshot encoding).

use thiserror::Error;

/// Errors that can occur at the boundaries of the pipeline
#[derive(Debug, Error)]
pub enum StepwiseError {
    #[error("Failed to parse transcript: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Problem has no steps: {0}")]
    EmptyProblem(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
