//! R2 Credentials Controller Library
//!
//! Managed-resource reconciliation for Cloudflare resources. The generic driver
//! lives in [`managed`]; the token issuer for R2 lives in
//! [`controller::credentials`].
//! Tests are included in the module files and under `tests/`.

pub mod clients;
pub mod cloudflare;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod managed;
pub mod observability;
pub mod runtime;

// Re-export CRD types for convenience
pub use crd::*;
