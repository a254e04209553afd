//! Error handlers
//!
//! Maps errors onto HTTP status codes and JSON bodies.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde_json::json;

use crate::error::types::{ApiError, StorageError};

/// Convert a storage error to its HTTP status code
pub fn status_for(err: &StorageError) -> StatusCode {
    match err {
        StorageError::Rejected(_) => StatusCode::BAD_REQUEST,
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::AlreadyExists(_) => StatusCode::CONFLICT,
        StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Log a storage error at the level matching its class
pub fn log_storage_error(err: &StorageError) {
    match err {
        StorageError::Io(e) => error!("Storage failure: {}", e),
        StorageError::Rejected(reason) => warn!("Rejected request: {}", reason),
        _ => {}
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Storage(e) => status_for(e),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoRoute => StatusCode::NOT_FOUND,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Storage(e) => e.client_message(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(e) = &self {
            log_storage_error(e);
        }
        let body = json!({ "success": false, "error": self.client_message() });
        (self.status(), Json(body)).into_response()
    }
}
