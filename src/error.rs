// src/error.rs

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failures that reach the API surface. Malformed model fields and
/// out-of-range reorders are absorbed earlier by the normalizers and the
/// order model and never show up here.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The extraction call produced no usable result for the batch. The
    /// previously displayed record, if any, stays intact.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Edit or export requested before any batch has been scanned.
    #[error("no shipment record loaded yet")]
    NoRecord,

    /// The caller addressed a field path outside the known set.
    #[error("unknown field path: {0}")]
    UnknownFieldPath(String),

    /// The pairing code does not exist (expired or mistyped).
    #[error("unknown pairing code: {0}")]
    UnknownPairingCode(String),
}

impl IntoResponse for ScanError {
    fn into_response(self) -> Response {
        let status = match &self {
            ScanError::Extraction(_) => StatusCode::BAD_GATEWAY,
            ScanError::NoRecord => StatusCode::CONFLICT,
            ScanError::UnknownFieldPath(_) => StatusCode::BAD_REQUEST,
            ScanError::UnknownPairingCode(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
