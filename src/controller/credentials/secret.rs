//! # R2 Connection Details
//!
//! S3-compatible credentials derived from an issued API token: the token ID
//! is the access key ID and the SHA-256 digest of the token value is the
//! secret access key.

use crate::constants::R2_STORAGE_DOMAIN;
use crate::managed::ConnectionDetails;
use sha2::{Digest, Sha256};

pub const KEY_ACCESS_KEY_ID: &str = "access_key_id";
pub const KEY_SECRET_ACCESS_KEY: &str = "secret_access_key";
pub const KEY_ENDPOINT: &str = "endpoint";
pub const KEY_TOKEN_VALUE: &str = "token_value";

/// Lowercase hex SHA-256 digest
#[must_use]
pub fn sha256_hex(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// S3-compatible endpoint host of an account
#[must_use]
pub fn r2_endpoint(account_id: &str) -> String {
    format!("{account_id}.{R2_STORAGE_DOMAIN}")
}

/// Connection details for a newly issued token
///
/// A missing token value is published as empty, so the secret access key is
/// the digest of the empty string.
#[must_use]
pub fn connection_details(
    token_id: &str,
    token_value: Option<&str>,
    account_id: &str,
) -> ConnectionDetails {
    let value = token_value.unwrap_or_default();
    ConnectionDetails::from([
        (KEY_ACCESS_KEY_ID.to_string(), token_id.as_bytes().to_vec()),
        (
            KEY_SECRET_ACCESS_KEY.to_string(),
            sha256_hex(value).into_bytes(),
        ),
        (KEY_ENDPOINT.to_string(), r2_endpoint(account_id).into_bytes()),
        (KEY_TOKEN_VALUE.to_string(), value.as_bytes().to_vec()),
    ])
}
