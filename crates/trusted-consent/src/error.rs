//! Error types for the consent server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Handlers never render errors themselves: [`AppError`] turns into a bare `500`
//! carrying an [`ErrorReport`], and the error-page middleware renders it.

use std::error::Error as _;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Errors from the admin API client.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The admin API answered with a non-success status.
    #[error("Admin API error ({status}): {error}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error identifier, or the raw body when it was not a provider error
        error: String,
        /// Human readable description from the provider
        description: Option<String>,
    },

    /// Response body did not match the expected schema.
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Admin URL could not be parsed.
    #[error("Invalid admin URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    /// Create an API error.
    #[must_use]
    pub fn api(status: u16, error: impl Into<String>, description: Option<String>) -> Self {
        Self::Api { status, error: error.into(), description }
    }

    /// HTTP status reported by the admin API, if the request got that far.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors surfaced to the user agent as an error page.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// The consent endpoint was called without a challenge.
    #[error("Expected a consent challenge to be set but received none.")]
    MissingChallenge,

    /// Fetching or accepting the consent request failed.
    #[error(transparent)]
    Admin(#[from] ClientError),

    /// The provider's `redirect_to` cannot be sent as a `Location` header.
    #[error("Provider returned an invalid redirect target")]
    InvalidRedirect(String),

    /// Unsafe request without a valid CSRF token.
    #[error("invalid csrf token")]
    Csrf,

    /// No route or static file matched.
    #[error("Not Found")]
    NotFound,
}

impl AppError {
    /// Short machine-readable kind, used in logs and the detail block.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingChallenge => "missing_challenge",
            Self::Admin(_) => "admin_api",
            Self::InvalidRedirect(_) => "invalid_redirect",
            Self::Csrf => "csrf",
            Self::NotFound => "not_found",
        }
    }

    /// Build the report handed to the error-page renderer.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        let mut causes = Vec::new();
        let mut source = self.source();
        while let Some(err) = source {
            causes.push(err.to_string());
            source = err.source();
        }

        let mut detail = serde_json::json!({
            "kind": self.kind(),
            "debug": format!("{self:?}"),
        });
        if let Self::Admin(ClientError::Api { status, error, description }) = self {
            detail["status"] = serde_json::json!(status);
            detail["error"] = serde_json::json!(error);
            detail["error_description"] = serde_json::json!(description);
        }
        if let Self::InvalidRedirect(target) = self {
            detail["redirect_to"] = serde_json::json!(target);
        }
        if !causes.is_empty() {
            detail["causes"] = serde_json::json!(causes);
        }

        ErrorReport { message: self.to_string(), detail }
    }
}

/// What an error page shows: a message, plus detail in development mode.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub message: String,
    pub detail: serde_json::Value,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(Arc::new(self.report()));
        response
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
