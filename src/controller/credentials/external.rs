//! # Credentials Lifecycle
//!
//! Connect, observe, create, update and delete for `Credentials`.

use super::permissions::lookup_r2_permission_groups;
use super::scope::build_resource_scope;
use super::secret::{connection_details, r2_endpoint};
use crate::clients::{resolve_credentials, ProviderConfigSource, UsageTracker};
use crate::cloudflare::{CreateTokenRequest, TokenApi, TokenApiFactory, TokenPolicy};
use crate::crd::{Condition, Credentials, CredentialsObservation, CredentialsStatus};
use crate::managed::meta;
use crate::managed::{
    ExternalClient, ExternalConnecter, ExternalCreation, ExternalDelete, ExternalObservation,
    ExternalUpdate, Managed, ManagedError,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves credentials and builds a [`CredentialsExternal`] for each pass
pub struct CredentialsConnector {
    configs: Arc<dyn ProviderConfigSource>,
    usage: Arc<dyn UsageTracker>,
    clients: Arc<dyn TokenApiFactory>,
}

impl std::fmt::Debug for CredentialsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConnector").finish_non_exhaustive()
    }
}

impl CredentialsConnector {
    #[must_use]
    pub fn new(
        configs: Arc<dyn ProviderConfigSource>,
        usage: Arc<dyn UsageTracker>,
        clients: Arc<dyn TokenApiFactory>,
    ) -> Self {
        Self {
            configs,
            usage,
            clients,
        }
    }
}

#[async_trait]
impl ExternalConnecter<Credentials> for CredentialsConnector {
    async fn connect(
        &self,
        cr: &Credentials,
    ) -> Result<Box<dyn ExternalClient<Credentials>>, ManagedError> {
        let credentials = resolve_credentials(self.configs.as_ref(), self.usage.as_ref(), cr)
            .await
            .map_err(ManagedError::authentication_unavailable)?;
        let api_token = credentials
            .api_token()
            .map_err(ManagedError::authentication_unavailable)?;
        Ok(Box::new(CredentialsExternal::new(
            self.clients.with_api_token(api_token),
        )))
    }
}

/// Token lifecycle against the Cloudflare API for one pass
pub struct CredentialsExternal {
    api: Arc<dyn TokenApi>,
}

impl std::fmt::Debug for CredentialsExternal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsExternal").finish_non_exhaustive()
    }
}

impl CredentialsExternal {
    #[must_use]
    pub fn new(api: Arc<dyn TokenApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ExternalClient<Credentials> for CredentialsExternal {
    async fn observe(&self, cr: &mut Credentials) -> Result<ExternalObservation, ManagedError> {
        let Some(token_id) = meta::external_name(cr).map(str::to_owned) else {
            return Ok(ExternalObservation::absent());
        };

        let token = match self.api.get_token(&token_id).await {
            Ok(token) => token,
            Err(e) if e.is_not_found() => {
                debug!(token.id = %token_id, "token not found");
                return Ok(ExternalObservation::absent());
            }
            Err(e) => return Err(ManagedError::TokenFetchFailed(e)),
        };

        let usable = token.is_usable();
        let endpoint = r2_endpoint(&cr.spec.for_provider.account_id);
        let status = cr.status.get_or_insert_with(CredentialsStatus::default);
        status.at_provider = CredentialsObservation {
            token_id: Some(token.id),
            status: token.status,
            issued_on: token.issued_on.map(|t| t.to_rfc3339()),
            endpoint: Some(endpoint),
        };
        if usable {
            cr.set_condition(Condition::available());
        } else {
            warn!(token.id = %token_id, "token is not active");
            cr.set_condition(Condition::unavailable());
        }

        Ok(ExternalObservation::up_to_date())
    }

    async fn create(&self, cr: &mut Credentials) -> Result<ExternalCreation, ManagedError> {
        let params = &cr.spec.for_provider;
        let permission_groups =
            lookup_r2_permission_groups(self.api.as_ref(), &params.permissions).await?;
        let resources = build_resource_scope(&params.account_id, params.bucket_name.as_deref());

        let request = CreateTokenRequest {
            name: params.name.clone(),
            policies: vec![TokenPolicy::allow(resources, permission_groups)],
        };
        let token = self
            .api
            .create_token(&request)
            .await
            .map_err(ManagedError::TokenCreationFailed)?;

        if token.value.is_none() {
            warn!(token.id = %token.id, "create response carried no token value");
        }
        let details = connection_details(
            &token.id,
            token.value.as_deref(),
            &cr.spec.for_provider.account_id,
        );
        meta::set_external_name(cr, &token.id);
        info!(token.id = %token.id, "issued R2 API token");

        Ok(ExternalCreation {
            connection_details: details,
        })
    }

    async fn update(&self, _cr: &Credentials) -> Result<ExternalUpdate, ManagedError> {
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, cr: &Credentials) -> Result<ExternalDelete, ManagedError> {
        let Some(token_id) = meta::external_name(cr) else {
            return Ok(ExternalDelete);
        };

        match self.api.delete_token(token_id).await {
            Ok(()) => {
                info!(token.id = %token_id, "revoked R2 API token");
                Ok(ExternalDelete)
            }
            Err(e) if e.is_not_found() => {
                debug!(token.id = %token_id, "token already gone");
                Ok(ExternalDelete)
            }
            Err(e) => Err(ManagedError::TokenDeletionFailed(e)),
        }
    }

    async fn disconnect(&self) -> Result<(), ManagedError> {
        Ok(())
    }
}
