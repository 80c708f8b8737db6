//! # Credential Extraction
//!
//! Reads raw credential bytes from the source named by a ProviderConfig.

use super::ProviderConfigSource;
use crate::crd::{CredentialsSource, ProviderCredentials};
use crate::managed::ManagedError;

/// Read the credential bytes for `credentials`
///
/// # Errors
///
/// `CredentialExtractionFailed` when the source is `None`, its selector is
/// missing, or the secret, variable or file cannot be read.
pub async fn extract_credentials(
    credentials: &ProviderCredentials,
    secrets: &dyn ProviderConfigSource,
) -> Result<Vec<u8>, ManagedError> {
    match credentials.source {
        CredentialsSource::None => Err(ManagedError::CredentialExtractionFailed(
            "credentials source None does not provide credentials".to_string(),
        )),
        CredentialsSource::Secret => {
            let selector = credentials.secret_ref.as_ref().ok_or_else(|| {
                ManagedError::CredentialExtractionFailed(
                    "cannot extract from secret key when none specified".to_string(),
                )
            })?;
            secrets.secret_key(selector).await
        }
        CredentialsSource::Environment => {
            let selector = credentials.env.as_ref().ok_or_else(|| {
                ManagedError::CredentialExtractionFailed(
                    "cannot extract from environment variable when none specified".to_string(),
                )
            })?;
            std::env::var(&selector.name)
                .map(String::into_bytes)
                .map_err(|e| {
                    ManagedError::CredentialExtractionFailed(format!(
                        "cannot read environment variable {}: {e}",
                        selector.name
                    ))
                })
        }
        CredentialsSource::Filesystem => {
            let selector = credentials.fs.as_ref().ok_or_else(|| {
                ManagedError::CredentialExtractionFailed(
                    "cannot extract from filesystem when no path specified".to_string(),
                )
            })?;
            tokio::fs::read(&selector.path).await.map_err(|e| {
                ManagedError::CredentialExtractionFailed(format!(
                    "cannot read file {}: {e}",
                    selector.path
                ))
            })
        }
    }
}
