//! # Cloudflare API
//!
//! Minimal client for the Cloudflare v4 user API token endpoints, used to
//! issue and revoke scoped R2 tokens.
//!
//! Uses a native REST implementation over reqwest with rustls, so tests can
//! point it at an in-process HTTP server.

mod client;
mod error;
mod types;

pub use client::{CloudflareClient, CloudflareClientFactory};
pub use error::{ApiError, ApiErrorKind, NOT_FOUND_MESSAGES};
pub use types::{
    ApiToken, CreateTokenRequest, Envelope, PermissionGroup, PermissionGroupRef, ResponseInfo,
    TokenPolicy,
};

use async_trait::async_trait;
use std::sync::Arc;

/// Operations on user API tokens
#[async_trait]
pub trait TokenApi: Send + Sync {
    /// List every permission group the caller may grant
    async fn list_permission_groups(&self) -> Result<Vec<PermissionGroup>, ApiError>;

    /// Create a token; the response is the only place its value appears
    async fn create_token(&self, request: &CreateTokenRequest) -> Result<ApiToken, ApiError>;

    /// Fetch a token by ID
    async fn get_token(&self, id: &str) -> Result<ApiToken, ApiError>;

    /// Revoke a token by ID
    async fn delete_token(&self, id: &str) -> Result<(), ApiError>;
}

/// Builds a [`TokenApi`] authenticated with an API token
pub trait TokenApiFactory: Send + Sync {
    fn with_api_token(&self, api_token: &str) -> Arc<dyn TokenApi>;
}
