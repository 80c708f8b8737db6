//! # R2 Credentials Controller
//!
//! Issues a Cloudflare API token scoped to R2 object access for each
//! `Credentials` resource and publishes it as S3-compatible credentials.
//!
//! The token ID is the external name. Tokens are never modified after
//! creation; the token value is only available from the create response.

mod external;
pub mod permissions;
pub mod scope;
pub mod secret;

pub use external::{CredentialsConnector, CredentialsExternal};

use super::SetupContext;
use crate::crd::Credentials;
use crate::managed::{KubeStore, ManagedReconciler, ReconcilerOptions, SecretPublisher};
use crate::clients::{KubeProviderConfigs, KubeUsageTracker};
use futures::future::BoxFuture;
use kube::Api;
use std::sync::Arc;

/// Name the controller registers under
pub const CONTROLLER_NAME: &str = "managed/credentials.r2.cloudflare.crossplane.io";

/// Build the driver for `Credentials` from the shared setup context
#[must_use]
pub fn reconciler(ctx: &SetupContext) -> ManagedReconciler<Credentials> {
    let connector = CredentialsConnector::new(
        Arc::new(KubeProviderConfigs::new(ctx.client.clone())),
        Arc::new(KubeUsageTracker::new(ctx.client.clone())),
        Arc::clone(&ctx.token_clients),
    );
    ManagedReconciler::new(
        CONTROLLER_NAME,
        Arc::new(connector),
        Arc::new(KubeStore::<Credentials>::new(ctx.client.clone())),
        Arc::new(SecretPublisher::new(ctx.client.clone())),
        Arc::clone(&ctx.limiter),
        ReconcilerOptions::from_config(&ctx.config),
    )
}

/// Register and run the `Credentials` controller until shutdown
pub fn setup(ctx: SetupContext) -> BoxFuture<'static, anyhow::Result<()>> {
    Box::pin(async move {
        let reconciler = Arc::new(reconciler(&ctx));
        let api: Api<Credentials> = Api::all(ctx.client.clone());
        crate::runtime::run_controller(api, reconciler, ctx.config.max_reconcile_rate).await;
        Ok(())
    })
}
