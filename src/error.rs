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
    /// The browser automation capability cannot be invoked. Fatal to
    /// starting the polling loop, not fatal to the process.
    #[error("Browser capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// No valid path to a fresh access token remains. The polling loop
    /// stops; a new interactive login is required.
    #[error("Authentication expired; a new interactive login is required")]
    AuthExpired,

    /// Anti-CSRF state mismatch during login capture.
    #[error("Unknown or already-consumed OAuth state")]
    InvalidState,

    /// Anti-bot middleware served something other than the expected JSON.
    /// Skips the current poll cycle; the loop continues.
    #[error("Response intercepted by bot detection: {0}")]
    Intercepted(String),

    /// A per-shift confirmation call failed. Logged per item, never
    /// propagated past the cycle.
    #[error("Shift confirmation failed: {0}")]
    Confirmation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Identity or resource provider returned an error.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
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
            AppError::CapabilityUnavailable(msg) => (
                StatusCode::BAD_REQUEST,
                "capability_unavailable",
                Some(msg.clone()),
            ),
            AppError::AuthExpired => (StatusCode::UNAUTHORIZED, "auth_expired", None),
            AppError::InvalidState => (StatusCode::BAD_REQUEST, "invalid_state", None),
            AppError::Intercepted(msg) => {
                (StatusCode::BAD_GATEWAY, "intercepted", Some(msg.clone()))
            }
            AppError::Confirmation(msg) => (
                StatusCode::BAD_GATEWAY,
                "confirmation_failed",
                Some(msg.clone()),
            ),
            AppError::Persistence(msg) => {
                tracing::error!(error = %msg, "Persistence error");
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", None)
            }
            AppError::Provider(msg) => {
                (StatusCode::BAD_GATEWAY, "provider_error", Some(msg.clone()))
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
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
