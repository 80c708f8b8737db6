//! # Managed Resource Errors
//!
//! Failure taxonomy of a reconciliation pass. Every variant except
//! `NotAManagedResource` is retried on the next scheduled pass.

use crate::cloudflare::ApiError;
use std::time::Duration;
use thiserror::Error;

/// Reconciliation pass failure
#[derive(Debug, Error)]
pub enum ManagedError {
    #[error("no providerConfigRef provided")]
    ConfigurationMissing,

    #[error("cannot resolve ProviderConfig {name}: {message}")]
    ConfigurationResolutionFailed { name: String, message: String },

    #[error("cannot extract credentials: {0}")]
    CredentialExtractionFailed(String),

    #[error("no api_token found in credentials")]
    NoUsableCredential,

    #[error("cannot connect to Cloudflare: {0}")]
    AuthenticationUnavailable(#[source] Box<ManagedError>),

    #[error("cannot lookup permission groups: {0}")]
    PermissionGroupLookupFailed(#[source] ApiError),

    #[error("no R2 permission groups found")]
    NoMatchingPermissionGroups,

    #[error("cannot create API token: {0}")]
    TokenCreationFailed(#[source] ApiError),

    #[error("cannot get API token: {0}")]
    TokenFetchFailed(#[source] ApiError),

    #[error("cannot delete API token: {0}")]
    TokenDeletionFailed(#[source] ApiError),

    #[error("managed resource is not a {expected} custom resource: {reason}")]
    NotAManagedResource { expected: String, reason: String },

    #[error("reconciliation pass exceeded {0:?}")]
    Timeout(Duration),

    #[error("cannot update managed resource: {0}")]
    Store(String),

    #[error("cannot publish connection details: {0}")]
    ConnectionPublishFailed(String),

    #[error("cannot determine creation result - remove the crossplane.io/external-create-pending annotation if it is safe to proceed")]
    IncompleteCreation,
}

impl ManagedError {
    /// Wrap a credential resolution failure raised while connecting
    #[must_use]
    pub fn authentication_unavailable(error: ManagedError) -> Self {
        match error {
            already @ ManagedError::AuthenticationUnavailable(_) => already,
            other => ManagedError::AuthenticationUnavailable(Box::new(other)),
        }
    }

    /// Programmer error; retrying cannot help
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ManagedError::NotAManagedResource { .. })
    }

    /// Stable label for metrics
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ManagedError::ConfigurationMissing => "configuration_missing",
            ManagedError::ConfigurationResolutionFailed { .. } => "configuration_resolution_failed",
            ManagedError::CredentialExtractionFailed(_) => "credential_extraction_failed",
            ManagedError::NoUsableCredential => "no_usable_credential",
            ManagedError::AuthenticationUnavailable(_) => "authentication_unavailable",
            ManagedError::PermissionGroupLookupFailed(_) => "permission_group_lookup_failed",
            ManagedError::NoMatchingPermissionGroups => "no_matching_permission_groups",
            ManagedError::TokenCreationFailed(_) => "token_creation_failed",
            ManagedError::TokenFetchFailed(_) => "token_fetch_failed",
            ManagedError::TokenDeletionFailed(_) => "token_deletion_failed",
            ManagedError::NotAManagedResource { .. } => "not_a_managed_resource",
            ManagedError::Timeout(_) => "timeout",
            ManagedError::Store(_) => "store",
            ManagedError::ConnectionPublishFailed(_) => "connection_publish_failed",
            ManagedError::IncompleteCreation => "incomplete_creation",
        }
    }
}

impl From<kube::Error> for ManagedError {
    fn from(error: kube::Error) -> Self {
        ManagedError::Store(error.to_string())
    }
}
