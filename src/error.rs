// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired session token")]
    InvalidToken,

    #[error("Not authorized for this resource")]
    NotAuthorized,

    #[error("No platform link: {0}")]
    LinkNotFound(String),

    #[error("Platform token expired, re-authentication required")]
    TokenExpired,

    #[error("Provider error (HTTP {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Build a provider error from an upstream HTTP status and body.
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        AppError::Provider {
            status,
            message: message.into(),
        }
    }

    /// True when the error means the platform link must be re-established
    /// before the operation can succeed (no silent refresh in this service).
    pub fn requires_relink(&self) -> bool {
        matches!(self, AppError::TokenExpired | AppError::LinkNotFound(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotAuthorized => (StatusCode::FORBIDDEN, "not_authorized", None),
            AppError::LinkNotFound(msg) => {
                (StatusCode::NOT_FOUND, "link_not_found", Some(msg.clone()))
            }
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired", None),
            AppError::Provider { status, message } => (
                StatusCode::BAD_GATEWAY,
                "provider_error",
                Some(format!("upstream {}: {}", status, message)),
            ),
            AppError::Fetch(msg) => (StatusCode::BAD_GATEWAY, "fetch_error", Some(msg.clone())),
            AppError::PlaylistNotFound(msg) => (
                StatusCode::NOT_FOUND,
                "playlist_not_found",
                Some(msg.clone()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
