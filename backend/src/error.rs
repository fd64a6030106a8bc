//! Error handling for the Tea Business Management Platform
//!
//! Hard failures only. Non-fatal data-integrity findings travel as
//! `shared::IntegrityWarning` values next to successful results, never
//! through this enum.

use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced entity absent: ingredient, recipe, pack, order
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Malformed or out-of-range caller data
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    /// Operation not permitted in the current lifecycle state
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Persistence collaborator failure
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias for the engine
pub type AppResult<T> = Result<T, AppError>;
