//! # Custom Resource Definitions
//!
//! CRD types for the Cloudflare provider.
//!
//! `Credentials` is the managed resource issuing scoped R2 API tokens;
//! `ProviderConfig` and `ProviderConfigUsage` carry and track the Cloudflare
//! credentials every managed resource authenticates with.

mod common;
mod provider;
mod status;

pub use common::*;
pub use provider::*;
pub use status::*;

use crate::managed::Managed;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Credentials Custom Resource Definition
///
/// Issues a Cloudflare API token restricted to R2 object access for one account,
/// or for one bucket within that account.
///
/// # Example
///
/// ```yaml
/// apiVersion: r2.cloudflare.crossplane.io/v1alpha1
/// kind: Credentials
/// metadata:
///   name: media-bucket-rw
/// spec:
///   forProvider:
///     accountId: 0123456789abcdef0123456789abcdef
///     bucketName: media
///     name: media-bucket-rw
///     permissions: [read, write]
///   writeConnectionSecretToRef:
///     namespace: media
///     name: r2-credentials
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Credentials",
    group = "r2.cloudflare.crossplane.io",
    version = "v1alpha1",
    status = "CredentialsStatus",
    shortname = "r2creds",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsSpec {
    /// Desired token parameters
    pub for_provider: CredentialsParameters,
    /// ProviderConfig holding the Cloudflare credentials used to issue the token
    /// Defaults to the ProviderConfig named `default`
    #[serde(default = "common::default_provider_config_ref")]
    pub provider_config_ref: Option<ProviderConfigReference>,
    /// Secret the issued token is written to
    #[serde(default)]
    pub write_connection_secret_to_ref: Option<SecretReference>,
    /// Whether the token is revoked when this resource is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

/// Token parameters
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsParameters {
    /// Cloudflare account ID owning the R2 buckets
    pub account_id: String,
    /// Restrict the token to this bucket; account-wide when unset
    #[serde(default)]
    pub bucket_name: Option<String>,
    /// Display name of the token in Cloudflare
    pub name: String,
    /// Requested object permissions. Empty grants both read and write.
    #[serde(default)]
    pub permissions: Vec<R2Permission>,
}

/// Abstract R2 object permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum R2Permission {
    Read,
    Write,
}

/// Status of the Credentials resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsStatus {
    /// Observed state of the issued token
    #[serde(default)]
    pub at_provider: CredentialsObservation,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Observed state of the issued token
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsObservation {
    /// Cloudflare token ID
    #[serde(default)]
    pub token_id: Option<String>,
    /// Token status reported by Cloudflare (e.g. "active")
    #[serde(default)]
    pub status: Option<String>,
    /// Issue time (RFC3339)
    #[serde(default)]
    pub issued_on: Option<String>,
    /// S3-compatible endpoint host for the account
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Managed for Credentials {
    fn provider_config_reference(&self) -> Option<&ProviderConfigReference> {
        self.spec.provider_config_ref.as_ref()
    }

    fn write_connection_secret_to_reference(&self) -> Option<&SecretReference> {
        self.spec.write_connection_secret_to_ref.as_ref()
    }

    fn deletion_policy(&self) -> DeletionPolicy {
        self.spec.deletion_policy
    }

    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map_or(&[][..], |s| s.conditions.as_slice())
    }

    fn set_condition(&mut self, condition: Condition) {
        let observed = self.status.get_or_insert_with(CredentialsStatus::default);
        status::set_condition(&mut observed.conditions, condition);
    }

    fn status_patch(&self) -> serde_json::Value {
        serde_json::json!({ "status": self.status })
    }
}
