//! # Error Policy
//!
//! Requeue scheduling for failed reconciliation passes.

use crate::managed::backoff::BackoffState;
use crate::managed::{Managed, ManagedError, ManagedReconciler};
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tracing::{error, info};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing resource does not
/// slow down the others. Fatal errors are not retried until the resource changes.
pub fn handle_reconciliation_error<M: Managed>(
    obj: Arc<M>,
    error: &ManagedError,
    ctx: Arc<ManagedReconciler<M>>,
) -> Action {
    let name = obj.name_any();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        controller = %ctx.name(),
        resource.name = %name,
        error = %error
    );
    let _error_guard = error_span.enter();

    if error.is_fatal() {
        error!("Reconciliation of {} failed permanently: {}", name, error);
        return Action::await_change();
    }

    error!("Reconciliation error for {}: {}", name, error);

    let (backoff_seconds, error_count) = {
        let mut states = ctx
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let state = states.entry(name.clone()).or_insert_with(BackoffState::default);
        state.increment_error();
        (state.backoff.next_backoff_seconds(), state.error_count)
    };

    info!(
        "Retrying {} with Fibonacci backoff: {}s (error count: {})",
        name, backoff_seconds, error_count
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}
