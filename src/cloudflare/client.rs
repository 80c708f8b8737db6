//! # Cloudflare REST Client
//!
//! reqwest client for the `/user/tokens` endpoints. Each call is timed and
//! counted; failures are converted to [`ApiError`] at this boundary.

use super::types::{ApiToken, CreateTokenRequest, Envelope, ErrorEnvelope, PermissionGroup};
use super::{ApiError, TokenApi, TokenApiFactory};
use crate::constants::CLOUDFLARE_REQUEST_TIMEOUT_SECS;
use crate::observability::metrics;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, Instrument};
use zeroize::Zeroizing;

/// Shares one connection pool across every authenticated client
#[derive(Debug, Clone)]
pub struct CloudflareClientFactory {
    http: ReqwestClient,
    base_url: Url,
}

impl CloudflareClientFactory {
    /// Create a factory for the API rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a hierarchical URL or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid Cloudflare API URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid Cloudflare API URL: {base_url} cannot carry a path");
        }
        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(CLOUDFLARE_REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("r2-credentials-controller/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url,
        })
    }
}

impl TokenApiFactory for CloudflareClientFactory {
    fn with_api_token(&self, api_token: &str) -> Arc<dyn TokenApi> {
        Arc::new(CloudflareClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            api_token: Zeroizing::new(api_token.to_string()),
        })
    }
}

/// Cloudflare API client authenticated with one API token
pub struct CloudflareClient {
    http: ReqwestClient,
    base_url: Url,
    api_token: Zeroizing<String>,
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CloudflareClient {
    /// Endpoint under the base URL; each segment is percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Endpoint of a single token
    ///
    /// IDs that would collapse into a different path cannot name a token.
    fn token_url(&self, id: &str) -> Result<Url, ApiError> {
        if matches!(id, "" | "." | "..") {
            return Err(ApiError::classify(None, "could not find token"));
        }
        Ok(self.url(&["user", "tokens", id]))
    }

    /// Send a request and unwrap the response envelope
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let start = Instant::now();
        let result = self
            .send::<T>(request)
            .instrument(tracing::debug_span!("cloudflare.api", operation))
            .await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind.as_str(),
        };
        metrics::record_provider_operation(operation, outcome, start.elapsed().as_secs_f64());
        debug!(operation, outcome, "Cloudflare API call");
        result
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Envelope<T>, ApiError> {
        let response = request
            .bearer_auth(self.api_token.as_str())
            .send()
            .await
            .map_err(|e| ApiError::transport(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| ApiError::transport(&e))?;

        if !(200..300).contains(&status) {
            let errors: ErrorEnvelope = serde_json::from_slice(&body).unwrap_or_default();
            let messages: Vec<String> = errors.errors.into_iter().map(|e| e.message).collect();
            return Err(ApiError::from_response(status, &messages));
        }

        let envelope: Envelope<T> = serde_json::from_slice(&body).map_err(|e| {
            ApiError::classify(Some(status), format!("cannot decode response: {e}"))
        })?;
        if !envelope.success {
            let messages: Vec<String> = envelope.errors.iter().map(|e| e.message.clone()).collect();
            return Err(ApiError::from_response(status, &messages));
        }
        Ok(envelope)
    }

    fn require<T>(envelope: Envelope<T>) -> Result<T, ApiError> {
        envelope
            .result
            .ok_or_else(|| ApiError::classify(None, "response has no result"))
    }
}

#[async_trait]
impl TokenApi for CloudflareClient {
    async fn list_permission_groups(&self) -> Result<Vec<PermissionGroup>, ApiError> {
        let request = self.http.get(self.url(&["user", "tokens", "permission_groups"]));
        let envelope = self.execute("list_permission_groups", request).await?;
        Ok(envelope.result.unwrap_or_default())
    }

    async fn create_token(&self, request: &CreateTokenRequest) -> Result<ApiToken, ApiError> {
        let request = self.http.post(self.url(&["user", "tokens"])).json(request);
        Self::require(self.execute("create_token", request).await?)
    }

    async fn get_token(&self, id: &str) -> Result<ApiToken, ApiError> {
        let request = self.http.get(self.token_url(id)?);
        Self::require(self.execute("get_token", request).await?)
    }

    async fn delete_token(&self, id: &str) -> Result<(), ApiError> {
        let request = self.http.delete(self.token_url(id)?);
        self.execute::<serde_json::Value>("delete_token", request)
            .await
            .map(|_| ())
    }
}
