use crate::{imaging::UnsupportedFormat, readiness::ReadinessState};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// First value for `key` among decoded query pairs.
pub fn first_query_value(pairs: Vec<(String, String)>, key: &str) -> Option<String> {
    pairs
        .into_iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ReadinessState,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Every failure the HTTP surface reports. Each variant maps to one status
/// code and a JSON `{"error": ...}` body.
#[derive(Debug)]
pub enum ApiError {
    MissingFile,
    EmptyFilename,
    UnsupportedFormat(UnsupportedFormat),
    MalformedUpload(String),
    PayloadTooLarge,
    ModelLoading,
    Processing(String),
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile
            | ApiError::EmptyFilename
            | ApiError::UnsupportedFormat(_)
            | ApiError::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelLoading => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Processing(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::MissingFile => "No file provided. Use field name 'file'.".to_string(),
            ApiError::EmptyFilename => "Empty filename.".to_string(),
            ApiError::UnsupportedFormat(rejected) => rejected.to_string(),
            ApiError::MalformedUpload(detail) => format!("Malformed upload: {}", detail),
            ApiError::PayloadTooLarge => "File too large.".to_string(),
            ApiError::ModelLoading => "Model is still loading.".to_string(),
            ApiError::Processing(detail) => format!("Processing failed: {}", detail),
            ApiError::Internal => "Internal server error.".to_string(),
        }
    }
}

impl From<UnsupportedFormat> for ApiError {
    fn from(rejected: UnsupportedFormat) -> Self {
        ApiError::UnsupportedFormat(rejected)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
