//! HTTP error mapping
//!
//! Store errors keep their kind all the way to the response: the kind picks
//! the status code and becomes the `code` field of the JSON body.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gprog_common::Error;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Store or validation failure
    #[error(transparent)]
    Store(#[from] Error),

    /// Malformed request body (400)
    #[error("Invalid request body: {0}")]
    BadBody(String),

    /// Malformed query string (400)
    #[error("Invalid query parameters: {0}")]
    BadQuery(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadQuery(rejection.body_text())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Store(Error::Database(err))
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::MissingField(_)
        | Error::InvalidFormat(_)
        | Error::OutOfRange(_)
        | Error::NotAssociated(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::DuplicateKey(_) | Error::Conflict(_) | Error::HasDependents(_) => StatusCode::CONFLICT,
        Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Store(err) => (status_for(err), err.code(), err.to_string()),
            ApiError::BadBody(msg) => (StatusCode::BAD_REQUEST, "INVALID_FORMAT", msg.clone()),
            ApiError::BadQuery(msg) => (StatusCode::BAD_REQUEST, "INVALID_FORMAT", msg.clone()),
        };

        if status.is_server_error() {
            error!("Request failed: {}", message);
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
