//! # Kubernetes-backed Credential Sources
//!
//! ProviderConfig lookup, secret key reads and `ProviderConfigUsage` tracking
//! against the Kubernetes API.

use super::{ProviderConfigSource, UsageTracker};
use crate::constants::FIELD_MANAGER;
use crate::crd::{
    ProviderConfig, ProviderConfigReference, ProviderConfigSpec, ProviderConfigUsage,
    ProviderConfigUsageSpec, SecretKeySelector, TypedReference,
};
use crate::managed::ManagedError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

/// Label pointing a usage at its ProviderConfig
pub const LABEL_PROVIDER_CONFIG: &str = "crossplane.io/provider-config";

/// Reads ProviderConfigs and Secrets through the Kubernetes API
#[derive(Clone)]
pub struct KubeProviderConfigs {
    client: Client,
}

impl std::fmt::Debug for KubeProviderConfigs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeProviderConfigs").finish_non_exhaustive()
    }
}

impl KubeProviderConfigs {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderConfigSource for KubeProviderConfigs {
    async fn provider_config(&self, name: &str) -> Result<ProviderConfigSpec, ManagedError> {
        let configs: Api<ProviderConfig> = Api::all(self.client.clone());
        configs
            .get(name)
            .await
            .map(|pc| pc.spec)
            .map_err(|e| ManagedError::ConfigurationResolutionFailed {
                name: name.to_string(),
                message: format!("cannot get referenced ProviderConfig: {e}"),
            })
    }

    async fn secret_key(&self, selector: &SecretKeySelector) -> Result<Vec<u8>, ManagedError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &selector.namespace);
        let secret = secrets.get(&selector.name).await.map_err(|e| {
            ManagedError::CredentialExtractionFailed(format!(
                "cannot get credentials secret {}/{}: {e}",
                selector.namespace, selector.name
            ))
        })?;

        secret
            .data
            .and_then(|mut data| data.remove(&selector.key))
            .map(|value| value.0)
            .ok_or_else(|| {
                ManagedError::CredentialExtractionFailed(format!(
                    "secret {}/{} has no key {}",
                    selector.namespace, selector.name, selector.key
                ))
            })
    }
}

/// Applies one `ProviderConfigUsage` per consuming managed resource
#[derive(Clone)]
pub struct KubeUsageTracker {
    client: Client,
}

impl std::fmt::Debug for KubeUsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeUsageTracker").finish_non_exhaustive()
    }
}

impl KubeUsageTracker {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Build the usage object recording that `consumer` uses `config`
///
/// Named after the consumer's UID so each consumer owns exactly one usage,
/// and owned by the consumer so it is removed along with it.
#[must_use]
pub fn usage_for(config: &ProviderConfigReference, consumer: &TypedReference) -> ProviderConfigUsage {
    let name = consumer.uid.clone().unwrap_or_else(|| consumer.name.clone());
    let mut usage = ProviderConfigUsage::new(
        &name,
        ProviderConfigUsageSpec {
            provider_config_ref: config.clone(),
            resource_ref: consumer.clone(),
        },
    );
    usage.metadata.labels = Some(BTreeMap::from([(
        LABEL_PROVIDER_CONFIG.to_string(),
        config.name.clone(),
    )]));
    usage.metadata.owner_references = consumer.uid.as_ref().map(|uid| {
        vec![OwnerReference {
            api_version: consumer.api_version.clone(),
            kind: consumer.kind.clone(),
            name: consumer.name.clone(),
            uid: uid.clone(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }]
    });
    usage
}

#[async_trait]
impl UsageTracker for KubeUsageTracker {
    async fn track(
        &self,
        config: &ProviderConfigReference,
        consumer: &TypedReference,
    ) -> Result<(), ManagedError> {
        let usage = usage_for(config, consumer);
        let name = usage.metadata.name.clone().unwrap_or_default();
        let usages: Api<ProviderConfigUsage> = Api::all(self.client.clone());
        usages
            .patch(
                &name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(&usage),
            )
            .await?;
        debug!(provider_config = %config.name, consumer = %consumer.name, "tracked ProviderConfig usage");
        Ok(())
    }
}
