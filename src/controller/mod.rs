//! # Controllers
//!
//! Managed-resource controllers of the provider and the probe server.
//!
//! Every controller is registered in [`custom_controllers`] and started by
//! [`setup_custom_controllers`] with a shared [`SetupContext`].

pub mod credentials;
pub mod server;

use crate::cloudflare::TokenApiFactory;
use crate::config::ControllerConfig;
use crate::managed::GlobalRateLimiter;
use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::info;

/// Shared dependencies handed to every controller setup function
#[derive(Clone)]
pub struct SetupContext {
    pub client: kube::Client,
    pub config: ControllerConfig,
    /// Process-wide limiter shared by all kinds
    pub limiter: Arc<GlobalRateLimiter>,
    pub token_clients: Arc<dyn TokenApiFactory>,
}

impl std::fmt::Debug for SetupContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SetupContext {
    #[must_use]
    pub fn new(
        client: kube::Client,
        config: ControllerConfig,
        token_clients: Arc<dyn TokenApiFactory>,
    ) -> Self {
        let limiter = Arc::new(GlobalRateLimiter::new(
            u32::from(config.max_reconcile_rate),
            config.rate_limit_burst(),
        ));
        Self {
            client,
            config,
            limiter,
            token_clients,
        }
    }
}

/// Runs one controller until shutdown
pub type SetupFn = fn(SetupContext) -> BoxFuture<'static, Result<()>>;

/// Every controller of the provider, by name
#[must_use]
pub fn custom_controllers() -> Vec<(&'static str, SetupFn)> {
    vec![(credentials::CONTROLLER_NAME, credentials::setup as SetupFn)]
}

/// Start every registered controller and wait until all of them stop
///
/// # Errors
///
/// Returns the first setup error; the remaining controllers are dropped.
pub async fn setup_custom_controllers(ctx: &SetupContext) -> Result<()> {
    let controllers = custom_controllers()
        .into_iter()
        .map(|(name, setup)| {
            info!(controller = name, "starting controller");
            setup(ctx.clone())
        })
        .collect::<Vec<_>>();
    futures::future::try_join_all(controllers).await?;
    Ok(())
}
