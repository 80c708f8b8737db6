//! # Managed Resources
//!
//! The external-resource lifecycle contract shared by every managed resource kind,
//! and the generic driver that runs it.
//!
//! A kind implements [`ExternalConnecter`] (build an authenticated client for one
//! pass) and [`ExternalClient`] (observe, create, update, delete, disconnect).
//! [`ManagedReconciler`] is written once against those traits and handles
//! finalizers, external-name bookkeeping, conditions, connection secrets,
//! timeouts and the shared rate limiter.

pub mod backoff;
mod error;
pub mod meta;
mod publisher;
pub mod ratelimiter;
mod reconciler;
mod store;

pub use error::ManagedError;
pub use publisher::{ConnectionPublisher, SecretPublisher};
pub use ratelimiter::GlobalRateLimiter;
pub use reconciler::{reconcile, ManagedReconciler, ReconcilerOptions};
pub use store::{KubeStore, ManagedStore};

use crate::crd::{Condition, DeletionPolicy, ProviderConfigReference, SecretReference, TypedReference};
use async_trait::async_trait;
use k8s_openapi::ClusterResourceScope;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Named byte values handed to consumers of an external resource
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// A cluster-scoped custom resource whose external counterpart is reconciled
pub trait Managed:
    Resource<DynamicType = (), Scope = ClusterResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// ProviderConfig used to authenticate against the external API
    fn provider_config_reference(&self) -> Option<&ProviderConfigReference>;

    /// Secret the connection details are written to
    fn write_connection_secret_to_reference(&self) -> Option<&SecretReference>;

    /// What happens to the external resource on deletion
    fn deletion_policy(&self) -> DeletionPolicy;

    /// Current conditions
    fn conditions(&self) -> &[Condition];

    /// Insert or replace a condition by type
    fn set_condition(&mut self, condition: Condition);

    /// Merge patch carrying the whole status subresource
    fn status_patch(&self) -> serde_json::Value;
}

/// Reference to a managed resource, as recorded by usage tracking
pub fn typed_reference<M: Managed>(mg: &M) -> TypedReference {
    TypedReference {
        api_version: M::api_version(&()).into_owned(),
        kind: M::kind(&()).into_owned(),
        name: mg.name_any(),
        uid: mg.uid(),
    }
}

/// Result of observing the external resource
#[derive(Debug, Clone, Default)]
pub struct ExternalObservation {
    /// The external resource exists
    pub resource_exists: bool,
    /// The external resource matches the desired state
    pub resource_up_to_date: bool,
    /// Connection details that can be re-derived on every observe
    pub connection_details: ConnectionDetails,
}

impl ExternalObservation {
    /// The external resource does not exist
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// The external resource exists and needs no update
    #[must_use]
    pub fn up_to_date() -> Self {
        Self {
            resource_exists: true,
            resource_up_to_date: true,
            connection_details: ConnectionDetails::new(),
        }
    }
}

/// Result of creating the external resource
#[derive(Debug, Clone, Default)]
pub struct ExternalCreation {
    /// Connection details available only at creation time
    pub connection_details: ConnectionDetails,
}

/// Result of updating the external resource
#[derive(Debug, Clone, Default)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

/// Result of deleting the external resource
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalDelete;

/// Produces an [`ExternalClient`] for one reconciliation pass
#[async_trait]
pub trait ExternalConnecter<M: Managed>: Send + Sync {
    /// Resolve credentials and build an authenticated client
    ///
    /// Failures short-circuit the pass; nothing else is attempted.
    async fn connect(&self, mg: &M) -> Result<Box<dyn ExternalClient<M>>, ManagedError>;
}

/// Lifecycle operations against the external API for one managed resource
#[async_trait]
pub trait ExternalClient<M: Managed>: Send + Sync {
    /// Report whether the external resource exists and is up to date.
    /// May write observed state into the status of `mg`.
    async fn observe(&self, mg: &mut M) -> Result<ExternalObservation, ManagedError>;

    /// Create the external resource. Must record the external name on `mg`.
    async fn create(&self, mg: &mut M) -> Result<ExternalCreation, ManagedError>;

    /// Bring the external resource in line with the desired state
    async fn update(&self, mg: &M) -> Result<ExternalUpdate, ManagedError>;

    /// Delete the external resource; a missing resource is not an error
    async fn delete(&self, mg: &M) -> Result<ExternalDelete, ManagedError>;

    /// Release per-pass resources
    async fn disconnect(&self) -> Result<(), ManagedError>;
}
