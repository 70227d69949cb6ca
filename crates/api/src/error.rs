//! HTTP rendering of application and ledger errors.
//!
//! Every failure leaves the API as `{"error": CODE, "message": text}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use vaultline_core::ledger::LedgerError;
use vaultline_shared::AppError;
use vaultline_shared::error::ErrorBody;

/// Error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable error code of the response.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.body.error
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        if err.status_code() >= 500 {
            error!(error = %err, "request failed");
        }
        Self {
            status: status(err.status_code()),
            body: err.to_body(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let code = err.http_status_code();
        if code >= 500 {
            error!(error = %err, code = err.error_code(), "ledger operation failed");
        }
        Self {
            status: status(code),
            body: ErrorBody {
                error: err.error_code().to_string(),
                message: err.public_message(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
