//! # Cloudflare Credentials
//!
//! Resolves the Cloudflare credentials a managed resource authenticates with:
//! ProviderConfig lookup, usage tracking, credential extraction and parsing.

mod extractor;
mod kubernetes;

pub use extractor::extract_credentials;
pub use kubernetes::{KubeProviderConfigs, KubeUsageTracker};

use crate::crd::{ProviderConfigReference, ProviderConfigSpec, SecretKeySelector, TypedReference};
use crate::managed::{typed_reference, Managed, ManagedError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;
use zeroize::Zeroizing;

/// Credentials key holding the scoped API token
pub const KEY_API_TOKEN: &str = "api_token";
/// Credentials key holding the account email (legacy global key auth)
pub const KEY_EMAIL: &str = "email";
/// Credentials key holding the global API key (legacy global key auth)
pub const KEY_API_KEY: &str = "api_key";

/// Read access to ProviderConfigs and the secrets they reference
#[async_trait]
pub trait ProviderConfigSource: Send + Sync {
    /// Fetch the spec of the named ProviderConfig
    async fn provider_config(&self, name: &str) -> Result<ProviderConfigSpec, ManagedError>;

    /// Read one key of a Secret
    async fn secret_key(&self, selector: &SecretKeySelector) -> Result<Vec<u8>, ManagedError>;
}

/// Records which managed resources use which ProviderConfig
#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Record that `consumer` uses `config`; repeated calls are no-ops
    async fn track(
        &self,
        config: &ProviderConfigReference,
        consumer: &TypedReference,
    ) -> Result<(), ManagedError>;
}

/// Parsed Cloudflare credentials; secret values are wiped on drop
#[derive(Default)]
pub struct CloudflareCredentials {
    api_token: Option<Zeroizing<String>>,
    email: Option<String>,
    api_key: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for CloudflareCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareCredentials")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("email", &self.email)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl CloudflareCredentials {
    /// Parse the flat JSON object stored in the credential source
    ///
    /// Empty values are treated as absent. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// `CredentialExtractionFailed` if the data is not a JSON object of strings.
    pub fn parse(data: &[u8]) -> Result<Self, ManagedError> {
        let mut values: BTreeMap<String, Zeroizing<String>> = serde_json::from_slice(data)
            .map_err(|e| {
                ManagedError::CredentialExtractionFailed(format!(
                    "cannot unmarshal cloudflare credentials as JSON: {e}"
                ))
            })?;

        let mut take = |key: &str| values.remove(key).filter(|v| !v.is_empty());
        Ok(Self {
            api_token: take(KEY_API_TOKEN),
            email: take(KEY_EMAIL).map(|v| v.as_str().to_owned()),
            api_key: take(KEY_API_KEY),
        })
    }

    /// The API token used for every token API call
    ///
    /// # Errors
    ///
    /// `NoUsableCredential` when no token was supplied; the email and global
    /// key pair cannot manage user tokens.
    pub fn api_token(&self) -> Result<&str, ManagedError> {
        self.api_token
            .as_deref()
            .map(String::as_str)
            .ok_or(ManagedError::NoUsableCredential)
    }

    /// Non-empty recognized keys, in the shape of a provider configuration block
    #[must_use]
    pub fn provider_configuration(&self) -> BTreeMap<&'static str, Zeroizing<String>> {
        let mut configuration = BTreeMap::new();
        if let Some(token) = &self.api_token {
            configuration.insert(KEY_API_TOKEN, token.clone());
        }
        if let Some(email) = &self.email {
            configuration.insert(KEY_EMAIL, Zeroizing::new(email.clone()));
        }
        if let Some(key) = &self.api_key {
            configuration.insert(KEY_API_KEY, key.clone());
        }
        configuration
    }
}

/// Resolve the credentials for `mg`
///
/// Looks up the referenced ProviderConfig, records the usage, then extracts
/// and parses the credentials.
///
/// # Errors
///
/// `ConfigurationMissing` without a reference, `ConfigurationResolutionFailed`
/// when the lookup or usage tracking fails, `CredentialExtractionFailed` when
/// the credentials cannot be read or parsed.
pub async fn resolve_credentials<M: Managed>(
    configs: &dyn ProviderConfigSource,
    usage: &dyn UsageTracker,
    mg: &M,
) -> Result<CloudflareCredentials, ManagedError> {
    let reference = mg
        .provider_config_reference()
        .filter(|r| !r.name.is_empty())
        .ok_or(ManagedError::ConfigurationMissing)?;

    let spec = configs.provider_config(&reference.name).await?;

    usage
        .track(reference, &typed_reference(mg))
        .await
        .map_err(|e| ManagedError::ConfigurationResolutionFailed {
            name: reference.name.clone(),
            message: format!("cannot track ProviderConfig usage: {e}"),
        })?;

    let data = extract_credentials(&spec.credentials, configs).await?;
    let credentials = CloudflareCredentials::parse(&data)?;
    debug!(
        provider_config = %reference.name,
        keys = ?credentials.provider_configuration().keys().collect::<Vec<_>>(),
        "resolved Cloudflare credentials"
    );
    Ok(credentials)
}
