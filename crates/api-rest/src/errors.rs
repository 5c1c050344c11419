//! Mapping storage failures to HTTP responses.
//!
//! Input errors map to client statuses, storage faults to server statuses.
//! `PathTraversal` is reported as a plain bad request; the response does not
//! distinguish it from other rejected input.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use phonevault_core::StorageError;

#[derive(Debug)]
pub enum ApiError {
    Storage(StorageError),
    BadRequest(String),
    NotFound,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Storage(err) => {
                let status = match &err {
                    StorageError::InvalidKey(_) | StorageError::PathTraversal(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    StorageError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    StorageError::Serialization(_)
                    | StorageError::InvalidEnumValue(_)
                    | StorageError::Backend(_)
                    | StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(error = %err, "storage failure");
                } else {
                    tracing::warn!(error = %err, "rejected request");
                }
                (status, err.to_string())
            }
            ApiError::BadRequest(message) => {
                tracing::warn!(error = %message, "rejected request");
                (StatusCode::BAD_REQUEST, message)
            }
            ApiError::NotFound => return StatusCode::NOT_FOUND.into_response(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
