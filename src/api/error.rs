//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::PharmacyError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<ShortfallDetail>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ShortfallDetail {
    pub drug_id: i64,
    pub requested: i64,
    pub available: i64,
    pub shortfall: i64,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Insufficient stock")]
    InsufficientStock(ShortfallDetail),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut shortfall = None;
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail.clone()),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::InsufficientStock(detail) => {
                shortfall = Some(*detail);
                (
                    StatusCode::CONFLICT,
                    "INSUFFICIENT_STOCK",
                    format!(
                        "Requested {} but only {} available",
                        detail.requested, detail.available
                    ),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                shortfall,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<PharmacyError> for ApiError {
    fn from(err: PharmacyError) -> Self {
        match err {
            PharmacyError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PharmacyError::Validation(detail) => ApiError::BadRequest(detail),
            PharmacyError::InsufficientStock {
                drug_id,
                requested,
                available,
                shortfall,
            } => ApiError::InsufficientStock(ShortfallDetail {
                drug_id,
                requested,
                available,
                shortfall,
            }),
            PharmacyError::Forbidden(detail) => ApiError::Forbidden(detail),
            PharmacyError::Persistence(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<crate::db::DatabaseError> for ApiError {
    fn from(err: crate::db::DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
