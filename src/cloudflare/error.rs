//! # Cloudflare API Errors
//!
//! Every failed API call is rendered as `HTTP status <code>[: <message>]` and
//! classified once, here, so callers match on [`ApiErrorKind`] instead of
//! inspecting message text.

use thiserror::Error;

/// Messages the Cloudflare API uses for a token that does not exist
pub const NOT_FOUND_MESSAGES: [&str; 3] = [
    "HTTP status 404: Could not find token",
    "HTTP status 404",
    "could not find token",
];

/// Classification of an API failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The requested object does not exist
    NotFound,
    /// Worth retrying: network failures, throttling, server errors
    Transient,
    /// Rejected request or credentials; retried on the next poll only
    Fatal,
}

impl ApiErrorKind {
    /// Label used in metrics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::Transient => "transient",
            ApiErrorKind::Fatal => "fatal",
        }
    }
}

/// Failed Cloudflare API call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    /// Classify a message, optionally with the HTTP status that produced it
    #[must_use]
    pub fn classify(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = if NOT_FOUND_MESSAGES.contains(&message.as_str()) {
            ApiErrorKind::NotFound
        } else {
            match status {
                Some(400 | 401 | 403) => ApiErrorKind::Fatal,
                _ => ApiErrorKind::Transient,
            }
        };
        Self { kind, message }
    }

    /// Error for a non-success response carrying the API's error messages
    #[must_use]
    pub fn from_response(status: u16, messages: &[String]) -> Self {
        let message = if messages.is_empty() {
            format!("HTTP status {status}")
        } else {
            format!("HTTP status {status}: {}", messages.join(", "))
        };
        Self::classify(Some(status), message)
    }

    /// Error raised before a response was received or while reading it
    #[must_use]
    pub fn transport(error: &reqwest::Error) -> Self {
        Self::classify(error.status().map(|s| s.as_u16()), error.to_string())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }
}
