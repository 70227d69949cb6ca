//! Application-wide error types.
//!
//! Domain failures carry their own taxonomy in the core crate; `AppError`
//! covers what the HTTP layer decides on its own (identity, ownership,
//! lookups scoped to the caller).

use serde::Serialize;
use thiserror::Error;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, expired, or invalid credentials.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but may not touch the resource.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found, or not visible to the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body returned to API clients for any error.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Builds the client-facing body.
    ///
    /// Internal failures never expose their detail text.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            Self::Unauthorized(m) | Self::Forbidden(m) | Self::NotFound(m) | Self::Validation(m) => {
                m.clone()
            }
            Self::Internal(_) => "Internal server error".to_string(),
        };
        ErrorBody {
            error: self.error_code().to_string(),
            message,
        }
    }
}
