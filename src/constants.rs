//! # Constants
//!
//! Defaults and well-known names shared across the controller.

/// Default port for the metrics and probe server
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// How long to wait for the probe server to bind during startup
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Poll interval while waiting for the probe server
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default interval between passes for a healthy resource
pub const DEFAULT_POLL_INTERVAL: &str = "1m";

/// Upper bound on a single reconciliation pass
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 180;

/// Default global reconcile rate (passes per second); burst is ten times this
pub const DEFAULT_MAX_RECONCILE_RATE: u16 = 10;

/// Requeue delay after a create or while a delete is in flight
pub const SHORT_WAIT_SECS: u64 = 30;

/// Attempts made to persist the external name after a successful create
pub const EXTERNAL_NAME_UPDATE_ATTEMPTS: u32 = 3;

/// Field manager used for server-side apply and merge patches
pub const FIELD_MANAGER: &str = "provider-cloudflare";

/// Cloudflare v4 API base URL
pub const DEFAULT_CLOUDFLARE_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Timeout for a single Cloudflare API request
pub const CLOUDFLARE_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Domain suffix of the R2 S3-compatible endpoint
pub const R2_STORAGE_DOMAIN: &str = "r2.cloudflarestorage.com";
