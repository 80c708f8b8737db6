//! Token policy resource scope for an account or a single bucket.

use std::collections::BTreeMap;

/// Single-entry resource map scoping a token to a bucket, or to the account
/// when no bucket is named
#[must_use]
pub fn build_resource_scope(account_id: &str, bucket_name: Option<&str>) -> BTreeMap<String, String> {
    let key = match bucket_name.filter(|bucket| !bucket.is_empty()) {
        Some(bucket) => format!("com.cloudflare.edge.r2.bucket.{account_id}_default_{bucket}"),
        None => format!("com.cloudflare.api.account.{account_id}"),
    };
    BTreeMap::from([(key, "*".to_string())])
}
