//! # Common Managed-Resource Fields
//!
//! Spec fields shared by every managed resource kind: provider config
//! reference, connection secret target, and deletion policy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to a cluster-scoped `ProviderConfig`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigReference {
    /// Name of the referenced ProviderConfig
    pub name: String,
}

impl Default for ProviderConfigReference {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
        }
    }
}

/// Default reference used when a resource omits `providerConfigRef`
#[allow(
    clippy::unnecessary_wraps,
    reason = "serde default functions must return the field type"
)]
pub(crate) fn default_provider_config_ref() -> Option<ProviderConfigReference> {
    Some(ProviderConfigReference::default())
}

/// Namespaced reference to a Kubernetes Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Name of the secret
    pub name: String,
    /// Namespace of the secret
    pub namespace: String,
}

/// Selects a single key of a namespaced Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Name of the secret
    pub name: String,
    /// Namespace of the secret
    pub namespace: String,
    /// Key within the secret data
    pub key: String,
}

/// What happens to the external resource when the managed resource is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum DeletionPolicy {
    /// Delete the external resource (DEFAULT)
    #[default]
    Delete,
    /// Leave the external resource in place
    Orphan,
}
