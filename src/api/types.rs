//! API request and response types.

use axum::{
    extract::{rejection::PathRejection, FromRequest, FromRequestParts},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;

// ==================== Envelope ====================

/// Envelope wrapping every successful response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 response carrying `data`.
    pub fn ok(data: T, message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: message.to_string(),
        })
    }

    /// 201 response carrying the created record.
    pub fn created(data: T, message: &str) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Self::ok(data, message))
    }
}

impl ApiResponse<()> {
    /// 200 response with no `data`.
    pub fn message(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: message.to_string(),
        })
    }
}

// ==================== Extractors ====================

/// JSON body extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Database connectivity.
    pub database: String,
    /// Timestamp.
    pub timestamp: String,
}
