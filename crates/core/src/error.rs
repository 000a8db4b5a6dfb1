//! Error types for AgriQA.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, LLM, open-data API, prompt,
//! session store and request validation errors.

use thiserror::Error;

/// Unified error type for AgriQA.
///
/// Component errors (fetch, intent parsing, composition) are recovered inside
/// the pipeline; whatever reaches this type is either a startup problem or an
/// infrastructure failure that the caller has to see.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Open-data API errors
    #[error("Data API error: {0}")]
    DataApi(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Session store errors
    #[error("Session store error: {0}")]
    Store(String),

    /// Rejected caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error is an infrastructure outage rather than a caller mistake.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AppError::Store(_) | AppError::Io(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
