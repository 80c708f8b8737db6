//! # Provider Configuration
//!
//! `ProviderConfig` holds the Cloudflare credential source; `ProviderConfigUsage`
//! records which managed resources depend on a given config.

use super::common::SecretKeySelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ProviderConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudflare.crossplane.io/v1beta1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   credentials:
///     source: Secret
///     secretRef:
///       namespace: crossplane-system
///       name: cloudflare-creds
///       key: credentials
/// ```
///
/// The referenced key holds a flat JSON object, e.g. `{"api_token": "..."}`.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfig",
    group = "cloudflare.crossplane.io",
    version = "v1beta1",
    shortname = "pc",
    printcolumn = r#"{"name":"Source", "type":"string", "jsonPath":".spec.credentials.source"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Where the Cloudflare credentials are read from
    pub credentials: ProviderCredentials,
}

/// Credential source descriptor plus the selectors the extractor needs
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// Source of the credentials
    pub source: CredentialsSource,
    /// Secret key holding the credentials (source: Secret)
    #[serde(default)]
    pub secret_ref: Option<SecretKeySelector>,
    /// Environment variable holding the credentials (source: Environment)
    #[serde(default)]
    pub env: Option<EnvSelector>,
    /// File holding the credentials (source: Filesystem)
    #[serde(default)]
    pub fs: Option<FsSelector>,
}

/// Supported credential sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum CredentialsSource {
    /// No credentials
    None,
    /// A key of a Kubernetes Secret
    Secret,
    /// An environment variable of the controller process
    Environment,
    /// A file mounted into the controller pod
    Filesystem,
}

/// Selects an environment variable
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct EnvSelector {
    /// Name of the environment variable
    pub name: String,
}

/// Selects a file path
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct FsSelector {
    /// Path of the file
    pub path: String,
}

/// ProviderConfigUsage records that a managed resource uses a ProviderConfig
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfigUsage",
    group = "cloudflare.crossplane.io",
    version = "v1beta1",
    printcolumn = r#"{"name":"Config", "type":"string", "jsonPath":".spec.providerConfigRef.name"}, {"name":"Resource", "type":"string", "jsonPath":".spec.resourceRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigUsageSpec {
    /// The ProviderConfig in use
    pub provider_config_ref: super::common::ProviderConfigReference,
    /// The managed resource using it
    pub resource_ref: TypedReference,
}

/// Reference to an object by API version, kind and name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypedReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: Option<String>,
}
