//! # Managed Resource Store
//!
//! Writes the driver makes against the managed resource itself: annotations,
//! finalizers and the status subresource. Abstracted so the driver can be
//! exercised without an API server.

use super::{Managed, ManagedError};
use crate::constants::FIELD_MANAGER;
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tracing::debug;

/// Persistence of managed-resource metadata and status
#[async_trait]
pub trait ManagedStore<M: Managed>: Send + Sync {
    /// Merge annotations into the stored object; `None` removes a key
    async fn update_annotations(
        &self,
        mg: &M,
        annotations: BTreeMap<String, Option<String>>,
    ) -> Result<(), ManagedError>;

    /// Replace the finalizer list of the stored object
    async fn update_finalizers(&self, mg: &M, finalizers: Vec<String>) -> Result<(), ManagedError>;

    /// Write the status subresource
    async fn update_status(&self, mg: &M) -> Result<(), ManagedError>;
}

/// [`ManagedStore`] backed by the Kubernetes API (merge patches)
pub struct KubeStore<M> {
    client: Client,
    _kind: PhantomData<fn() -> M>,
}

impl<M> std::fmt::Debug for KubeStore<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl<M: Managed> KubeStore<M> {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }

    fn api(&self) -> Api<M> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl<M: Managed> ManagedStore<M> for KubeStore<M> {
    async fn update_annotations(
        &self,
        mg: &M,
        annotations: BTreeMap<String, Option<String>>,
    ) -> Result<(), ManagedError> {
        let name = mg.name_any();
        let patch = json!({ "metadata": { "annotations": annotations } });
        self.api()
            .patch(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await?;
        debug!(resource.name = %name, "updated annotations");
        Ok(())
    }

    async fn update_finalizers(&self, mg: &M, finalizers: Vec<String>) -> Result<(), ManagedError> {
        let name = mg.name_any();
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        match self
            .api()
            .patch(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await
        {
            Ok(_) => Ok(()),
            // Removing the last finalizer may race with garbage collection
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_status(&self, mg: &M) -> Result<(), ManagedError> {
        let name = mg.name_any();
        match self
            .api()
            .patch_status(
                &name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(mg.status_patch()),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                debug!(resource.name = %name, "resource gone before status update");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
