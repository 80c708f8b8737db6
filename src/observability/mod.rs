//! # Observability
//!
//! Prometheus metrics for the controller and its Cloudflare API calls.
//! Logging is plain `tracing`, configured in [`crate::runtime::initialization`].

pub mod metrics;
