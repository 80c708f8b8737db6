//! # Cloudflare API Types
//!
//! Request and response bodies of the user API token endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response envelope shared by every v4 endpoint
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ResponseInfo>,
    pub result: Option<T>,
}

/// Entry of the `errors` array of an envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseInfo {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Error-only view of an envelope, used when the result cannot be decoded
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub errors: Vec<ResponseInfo>,
}

/// Permission group that can be granted to an API token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Reference to a permission group inside a token policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroupRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&PermissionGroup> for PermissionGroupRef {
    fn from(group: &PermissionGroup) -> Self {
        Self {
            id: group.id.clone(),
            name: Some(group.name.clone()),
        }
    }
}

/// Token policy: an effect applied to a set of resources for a set of permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPolicy {
    pub effect: String,
    /// Resource key to `"*"`
    pub resources: BTreeMap<String, String>,
    pub permission_groups: Vec<PermissionGroupRef>,
}

impl TokenPolicy {
    #[must_use]
    pub fn allow(resources: BTreeMap<String, String>, permission_groups: Vec<PermissionGroupRef>) -> Self {
        Self {
            effect: "allow".to_string(),
            resources,
            permission_groups,
        }
    }
}

/// Body of `POST /user/tokens`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTokenRequest {
    pub name: String,
    pub policies: Vec<TokenPolicy>,
}

/// API token as returned by the token endpoints
///
/// `value` is only present in the response to the create call.
#[derive(Clone, Deserialize)]
pub struct ApiToken {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub issued_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ApiToken {
    /// A token without a reported status is assumed active
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.status.as_deref().is_none_or(|status| status == "active")
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiToken")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("issued_on", &self.issued_on)
            .field("value", &self.value.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
