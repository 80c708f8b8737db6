//! # Connection Publisher
//!
//! Writes connection details to the Secret named by
//! `writeConnectionSecretToRef`. The Secret is owned by the managed resource
//! so it is garbage collected with it.

use super::{ConnectionDetails, Managed, ManagedError};
use crate::constants::FIELD_MANAGER;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, info};

/// Secret type used for connection secrets
pub const CONNECTION_SECRET_TYPE: &str = "connection.crossplane.io/v1alpha1";

/// Delivers connection details to consumers
#[async_trait]
pub trait ConnectionPublisher<M: Managed>: Send + Sync {
    /// Publish the details; a resource without a secret reference is a no-op
    async fn publish(&self, mg: &M, details: &ConnectionDetails) -> Result<(), ManagedError>;
}

/// [`ConnectionPublisher`] writing a Kubernetes Secret with server-side apply
#[derive(Clone)]
pub struct SecretPublisher {
    client: Client,
}

impl std::fmt::Debug for SecretPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretPublisher").finish_non_exhaustive()
    }
}

impl SecretPublisher {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<M: Managed> ConnectionPublisher<M> for SecretPublisher {
    async fn publish(&self, mg: &M, details: &ConnectionDetails) -> Result<(), ManagedError> {
        let Some(reference) = mg.write_connection_secret_to_reference() else {
            debug!(resource.name = %mg.name_any(), "no connection secret reference, skipping publish");
            return Ok(());
        };

        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(reference.name.clone()),
                namespace: Some(reference.namespace.clone()),
                owner_references: mg.controller_owner_ref(&()).map(|owner| vec![owner]),
                ..Default::default()
            },
            type_: Some(CONNECTION_SECRET_TYPE.to_string()),
            data: Some(
                details
                    .iter()
                    .map(|(key, value)| (key.clone(), ByteString(value.clone())))
                    .collect(),
            ),
            ..Default::default()
        };

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &reference.namespace);
        secrets
            .patch(
                &reference.name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(&secret),
            )
            .await
            .map_err(|e| {
                ManagedError::ConnectionPublishFailed(format!(
                    "secret {}/{}: {e}",
                    reference.namespace, reference.name
                ))
            })?;

        info!(
            secret.namespace = %reference.namespace,
            secret.name = %reference.name,
            keys = details.len(),
            "published connection details"
        );
        Ok(())
    }
}
