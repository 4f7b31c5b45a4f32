//! API error types and response formatting.
//!
//! Every JSON body this layer produces follows the envelope convention
//! `{"success": bool, ...}`; errors carry `{"success": false, "error": <msg>}`.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Fixed client-facing message for internal errors outside development mode.
const GENERIC_INTERNAL_MESSAGE: &str = "internal server error";

/// Whether internal error messages are exposed to clients.
///
/// Set once at startup from the deployment mode; raw error strings may only
/// leak to clients in development.
static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Configure whether internal error detail is exposed in responses.
pub fn expose_error_details(enabled: bool) {
    EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

pub(crate) fn details_exposed() -> bool {
    EXPOSE_DETAILS.load(Ordering::Relaxed)
}

/// API error type that converts to enveloped HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid request parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The database is not connected (yet, or the connect attempt failed).
    #[error("database unavailable")]
    DatabaseUnavailable,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error envelope body.
#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg)),
            Self::DatabaseUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody::new("database not connected"),
            ),
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                let message = if details_exposed() {
                    err.to_string()
                } else {
                    GENERIC_INTERNAL_MESSAGE.to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(message))
            }
        };

        (status, Json(body)).into_response()
    }
}
