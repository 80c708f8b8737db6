//! # Watch Loop
//!
//! Runs the registered controllers, each a kube-runtime `Controller` for one
//! managed resource kind.

use super::error_policy::handle_reconciliation_error;
use super::initialization::InitializationResult;
use crate::controller::setup_custom_controllers;
use crate::managed::{reconcile, Managed, ManagedReconciler};
use futures::StreamExt;
use kube::Api;
use kube_runtime::controller::{Config as ControllerRuntimeConfig, Controller};
use kube_runtime::watcher;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run every registered controller until shutdown
///
/// # Errors
///
/// Returns an error if a controller fails to start.
pub async fn run_watch_loop(init: InitializationResult) -> anyhow::Result<()> {
    let result = setup_custom_controllers(&init.setup_context).await;
    init.server_state.is_ready.store(false, Ordering::Relaxed);
    info!("All controllers stopped");
    result
}

/// Watch every object of kind `M` and reconcile it until shutdown is signalled
///
/// `concurrency` bounds how many objects are reconciled at once; a single
/// object is never reconciled concurrently with itself.
pub async fn run_controller<M: Managed>(
    api: Api<M>,
    reconciler: Arc<ManagedReconciler<M>>,
    concurrency: u16,
) {
    let controller_name = reconciler.name().to_string();
    info!(controller = %controller_name, concurrency, "watching managed resources");

    Controller::new(api, watcher::Config::default().any_semantic())
        .with_config(ControllerRuntimeConfig::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile::<M>, handle_reconciliation_error::<M>, reconciler)
        .for_each(|result| {
            let controller_name = controller_name.clone();
            async move {
                match result {
                    Ok((object, action)) => {
                        debug!(controller = %controller_name, resource.name = %object.name, ?action, "reconciled");
                    }
                    Err(kube_runtime::controller::Error::ReconcilerFailed(e, object)) => {
                        // Already logged and scheduled by the error policy
                        debug!(controller = %controller_name, resource.name = %object.name, error = %e, "reconcile failed");
                    }
                    Err(e) => {
                        warn!(controller = %controller_name, error = %e, "controller stream error");
                    }
                }
            }
        })
        .await;

    info!(controller = %controller_name, "controller stopped");
}
