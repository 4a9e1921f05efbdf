//! Error types for the roster service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
///
/// Wraps a gpeval-common error; the HTTP status and error code follow its kind.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] gpeval_common::Error);

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use gpeval_common::Error as E;

        match &self.0 {
            E::InvalidName(_) => (StatusCode::BAD_REQUEST, "INVALID_NAME"),
            E::BatchTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "BATCH_TOO_LARGE"),
            E::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            E::OutOfScope(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            E::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            e if e.is_transient() => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        let message = self.0.to_string();

        if status.is_server_error() {
            error!(code = error_code, "Request failed: {}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use gpeval_common::Error;

    #[test]
    fn test_common_errors_map_to_codes() {
        let cases = [
            (Error::InvalidName("empty".into()), StatusCode::BAD_REQUEST, "INVALID_NAME"),
            (
                Error::BatchTooLarge { size: 101, max: 100 },
                StatusCode::PAYLOAD_TOO_LARGE,
                "BATCH_TOO_LARGE",
            ),
            (Error::InvalidInput("month".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (Error::OutOfScope("gp 3".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (Error::NotFound("gp 3".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                Error::Database(sqlx::Error::PoolTimedOut),
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
            ),
            (
                Error::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(ApiError::from(err).parts(), (status, code));
        }
    }
}
