//! # Reconciler Configuration
//!
//! Poll interval, pass timeout, global rate and remote API settings shared by
//! every managed-resource controller in the process.

use super::{env_var_or_default, parse_kubernetes_duration};
use crate::constants::{
    DEFAULT_CLOUDFLARE_API_BASE_URL, DEFAULT_MAX_RECONCILE_RATE, DEFAULT_POLL_INTERVAL,
    DEFAULT_RECONCILE_TIMEOUT_SECS,
};
use anyhow::{Context, Result};
use std::time::Duration;

/// Settings applied to every managed-resource controller
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Interval between passes for a resource that is in sync
    pub poll_interval: Duration,
    /// Upper bound on one reconciliation pass
    pub reconcile_timeout: Duration,
    /// Global passes per second across all kinds
    /// Also used as the number of concurrent workers per controller
    pub max_reconcile_rate: u16,
    /// Base URL of the Cloudflare v4 API
    pub api_base_url: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            reconcile_timeout: Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
            max_reconcile_rate: DEFAULT_MAX_RECONCILE_RATE,
            api_base_url: DEFAULT_CLOUDFLARE_API_BASE_URL.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    ///
    /// Returns an error if `POLL_INTERVAL` or `RECONCILE_TIMEOUT` is not a valid
    /// Kubernetes duration string.
    pub fn from_env() -> Result<Self> {
        let poll = std::env::var("POLL_INTERVAL").unwrap_or_else(|_| DEFAULT_POLL_INTERVAL.to_string());
        let mut config = Self::default().with_poll_interval(&poll)?;

        if let Ok(timeout) = std::env::var("RECONCILE_TIMEOUT") {
            config.reconcile_timeout = parse_kubernetes_duration(&timeout)
                .context("Invalid RECONCILE_TIMEOUT")?;
        }
        config.max_reconcile_rate =
            env_var_or_default("MAX_RECONCILE_RATE", config.max_reconcile_rate).max(1);
        if let Ok(url) = std::env::var("CLOUDFLARE_API_BASE_URL") {
            if !url.trim().is_empty() {
                config.api_base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        Ok(config)
    }

    /// Override the poll interval from a Kubernetes duration string
    ///
    /// # Errors
    ///
    /// Returns an error if the duration cannot be parsed.
    pub fn with_poll_interval(mut self, poll: &str) -> Result<Self> {
        self.poll_interval = parse_kubernetes_duration(poll).context("Invalid poll interval")?;
        Ok(self)
    }

    /// Override the global reconcile rate, clamped to at least one pass per second
    #[must_use]
    pub fn with_max_reconcile_rate(mut self, rate: u16) -> Self {
        self.max_reconcile_rate = rate.max(1);
        self
    }

    /// Burst capacity of the shared rate limiter
    #[must_use]
    pub fn rate_limit_burst(&self) -> u32 {
        u32::from(self.max_reconcile_rate) * 10
    }
}
