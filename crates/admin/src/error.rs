//! Unified error handling for the admin console.

use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::services::sms::SmsError;

/// Application-level error type for the admin console.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend operation failed (includes policy denials and rejected
    /// bypass secrets, surfaced verbatim - there is no path fallback).
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration loading failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// SMS provider operation failed.
    #[error("SMS error: {0}")]
    Sms(#[from] SmsError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not valid for the entity's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
