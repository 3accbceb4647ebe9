use crate::auth::AuthError;
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Failures the HTTP API reports to callers.
#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    LicenseNotFound,
    DeviceNotFound,
    Unauthorized(String),
    Internal(String),
}

/// `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::InvalidRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                format!("Invalid request body: {detail}"),
            ),
            ApiError::LicenseNotFound => (
                StatusCode::NOT_FOUND,
                "LICENSE_NOT_FOUND",
                "License not found".to_string(),
            ),
            ApiError::DeviceNotFound => (
                StatusCode::NOT_FOUND,
                "DEVICE_NOT_FOUND",
                "Device not found".to_string(),
            ),
            ApiError::Unauthorized(detail) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", detail),
            ApiError::Internal(detail) => {
                error!("internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERVER_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => e.into(),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}
