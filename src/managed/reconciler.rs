//! # Managed Reconciler
//!
//! Generic reconciliation driver for managed resources.
//!
//! One pass: consult the global rate limiter, then under a deadline connect,
//! observe, and create, update or delete the external resource as needed.
//! Finalizers, external-name bookkeeping, conditions, connection secrets and
//! requeue scheduling are handled here so every kind shares them.

use super::backoff::BackoffState;
use super::meta::{
    self, ANNOTATION_EXTERNAL_CREATE_FAILED, ANNOTATION_EXTERNAL_CREATE_PENDING,
    ANNOTATION_EXTERNAL_CREATE_SUCCEEDED, ANNOTATION_EXTERNAL_NAME,
};
use super::{
    ConnectionPublisher, ExternalClient, ExternalConnecter, GlobalRateLimiter, Managed,
    ManagedError, ManagedStore,
};
use crate::config::ControllerConfig;
use crate::constants::{EXTERNAL_NAME_UPDATE_ATTEMPTS, SHORT_WAIT_SECS};
use crate::crd::{Condition, DeletionPolicy};
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Instrument};

/// Timing knobs of the driver
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Requeue delay for a resource that is in sync
    pub poll_interval: Duration,
    /// Deadline for one pass
    pub timeout: Duration,
    /// Requeue delay right after a create or delete request
    pub short_wait: Duration,
    /// Attempts at recording the outcome of a create call
    pub external_name_attempts: u32,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

impl ReconcilerOptions {
    #[must_use]
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            timeout: config.reconcile_timeout,
            short_wait: Duration::from_secs(SHORT_WAIT_SECS),
            external_name_attempts: EXTERNAL_NAME_UPDATE_ATTEMPTS,
        }
    }
}

/// Reconciles one managed resource kind against its external API
pub struct ManagedReconciler<M: Managed> {
    name: String,
    connecter: Arc<dyn ExternalConnecter<M>>,
    store: Arc<dyn ManagedStore<M>>,
    publisher: Arc<dyn ConnectionPublisher<M>>,
    limiter: Arc<GlobalRateLimiter>,
    options: ReconcilerOptions,
    /// Per-resource error backoff, keyed by resource name
    pub(crate) backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl<M: Managed> std::fmt::Debug for ManagedReconciler<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedReconciler")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Entry point handed to `kube_runtime::Controller::run`
///
/// # Errors
///
/// Returns the error of the failed pass; the error policy schedules the retry.
pub async fn reconcile<M: Managed>(
    mg: Arc<M>,
    ctx: Arc<ManagedReconciler<M>>,
) -> Result<Action, ManagedError> {
    ctx.reconcile(mg.as_ref()).await
}

impl<M: Managed> ManagedReconciler<M> {
    pub fn new(
        name: impl Into<String>,
        connecter: Arc<dyn ExternalConnecter<M>>,
        store: Arc<dyn ManagedStore<M>>,
        publisher: Arc<dyn ConnectionPublisher<M>>,
        limiter: Arc<GlobalRateLimiter>,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            name: name.into(),
            connecter,
            store,
            publisher,
            limiter,
            options,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Controller name, e.g. `managed/credentials.r2.cloudflare.crossplane.io`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// Run one reconciliation pass for `mg`
    ///
    /// # Errors
    ///
    /// Any failure of the pass. The Synced condition has already been set to
    /// the error message (best effort) when this returns.
    pub async fn reconcile(&self, mg: &M) -> Result<Action, ManagedError> {
        let name = mg.name_any();
        let span = tracing::info_span!(
            "managed.reconcile",
            controller = %self.name,
            resource.kind = %M::kind(&()),
            resource.name = %name,
        );

        async move {
            metrics::increment_reconciliations();

            let delay = self.limiter.when();
            if !delay.is_zero() {
                debug!(delay_ms = delay.as_millis(), "rate limited, requeueing");
                metrics::increment_rate_limited();
                metrics::increment_requeues_total("rate-limited");
                return Ok(Action::requeue(delay));
            }

            let start = Instant::now();
            let mut managed = mg.clone();
            let outcome =
                match tokio::time::timeout(self.options.timeout, self.pass(&mut managed)).await {
                    Ok(outcome) => outcome,
                    Err(_elapsed) => Err(ManagedError::Timeout(self.options.timeout)),
                };
            metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

            match outcome {
                Ok(action) => {
                    self.reset_backoff(&name);
                    Ok(action)
                }
                Err(error) => {
                    self.record_failure(&mut managed, &error).await;
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn pass(&self, mg: &mut M) -> Result<Action, ManagedError> {
        if mg.meta().name.as_deref().is_none_or(str::is_empty) {
            return Err(ManagedError::NotAManagedResource {
                expected: M::kind(&()).into_owned(),
                reason: "object has no name".to_string(),
            });
        }

        if meta::is_deleting(mg) && mg.deletion_policy() == DeletionPolicy::Orphan {
            info!("deletion policy is Orphan, leaving external resource in place");
            mg.set_condition(Condition::deleting());
            return self.finalize(mg).await;
        }

        if !meta::is_deleting(mg) && meta::external_create_incomplete(mg) {
            warn!("a previous create did not record its outcome, refusing to create again");
            return Err(ManagedError::IncompleteCreation);
        }

        let external = self.connecter.connect(mg).await?;
        let outcome = self.drive(mg, external.as_ref()).await;
        if let Err(e) = external.disconnect().await {
            warn!(error = %e, "cannot disconnect from external API");
        }
        outcome
    }

    async fn drive(
        &self,
        mg: &mut M,
        external: &dyn ExternalClient<M>,
    ) -> Result<Action, ManagedError> {
        let observation = external.observe(mg).await?;

        if meta::is_deleting(mg) {
            if observation.resource_exists {
                mg.set_condition(Condition::deleting());
                external.delete(mg).await?;
                metrics::increment_external_resources_deleted();
                info!("requested deletion of external resource");
                mg.set_condition(Condition::reconcile_success());
                self.store.update_status(mg).await?;
                metrics::increment_requeues_total("deleting");
                return Ok(Action::requeue(self.options.short_wait));
            }
            return self.finalize(mg).await;
        }

        if !meta::has_finalizer(mg) {
            let finalizers = meta::finalizers_with(mg);
            self.store.update_finalizers(mg, finalizers.clone()).await?;
            mg.meta_mut().finalizers = Some(finalizers);
            debug!("added finalizer");
        }

        if !observation.resource_exists {
            return self.create(mg, external).await;
        }

        if !observation.connection_details.is_empty() {
            self.publisher
                .publish(mg, &observation.connection_details)
                .await?;
        }

        if !observation.resource_up_to_date {
            let update = external.update(mg).await?;
            info!("requested update of external resource");
            if !update.connection_details.is_empty() {
                self.publisher.publish(mg, &update.connection_details).await?;
            }
        }

        mg.set_condition(Condition::reconcile_success());
        self.store.update_status(mg).await?;
        metrics::increment_requeues_total("poll");
        Ok(Action::requeue(self.options.poll_interval))
    }

    async fn create(
        &self,
        mg: &mut M,
        external: &dyn ExternalClient<M>,
    ) -> Result<Action, ManagedError> {
        let pending = meta::now_rfc3339();
        self.store
            .update_annotations(
                mg,
                BTreeMap::from([(
                    ANNOTATION_EXTERNAL_CREATE_PENDING.to_string(),
                    Some(pending.clone()),
                )]),
            )
            .await?;
        meta::set_annotation(mg, ANNOTATION_EXTERNAL_CREATE_PENDING, &pending);
        mg.set_condition(Condition::creating());

        let creation = match external.create(mg).await {
            Ok(creation) => creation,
            Err(e) => {
                let failed = meta::now_rfc3339();
                meta::set_annotation(mg, ANNOTATION_EXTERNAL_CREATE_FAILED, &failed);
                let annotations = BTreeMap::from([(
                    ANNOTATION_EXTERNAL_CREATE_FAILED.to_string(),
                    Some(failed),
                )]);
                // Left unrecorded, the pending annotation blocks every later create
                if let Err(store_error) = self.persist_annotations(mg, annotations).await {
                    error!(
                        error = %store_error,
                        "cannot record failed create; remove the pending annotation to retry"
                    );
                }
                return Err(e);
            }
        };
        metrics::increment_external_resources_created();

        let succeeded = meta::now_rfc3339();
        meta::set_annotation(mg, ANNOTATION_EXTERNAL_CREATE_SUCCEEDED, &succeeded);
        let mut annotations = BTreeMap::from([(
            ANNOTATION_EXTERNAL_CREATE_SUCCEEDED.to_string(),
            Some(succeeded),
        )]);
        if let Some(external_name) = meta::external_name(mg) {
            info!(external_name, "created external resource");
            annotations.insert(
                ANNOTATION_EXTERNAL_NAME.to_string(),
                Some(external_name.to_string()),
            );
        }
        if let Err(e) = self.persist_annotations(mg, annotations).await {
            error!(
                external_name = meta::external_name(mg).unwrap_or_default(),
                error = %e,
                "cannot record external name of created resource; it may be leaked"
            );
            return Err(e);
        }

        if !creation.connection_details.is_empty() {
            self.publisher
                .publish(mg, &creation.connection_details)
                .await?;
        }

        mg.set_condition(Condition::reconcile_success());
        self.store.update_status(mg).await?;
        metrics::increment_requeues_total("created");
        Ok(Action::requeue(self.options.short_wait))
    }

    /// Write creation bookkeeping annotations, retrying with a short linear delay
    async fn persist_annotations(
        &self,
        mg: &M,
        annotations: BTreeMap<String, Option<String>>,
    ) -> Result<(), ManagedError> {
        let attempts = self.options.external_name_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.update_annotations(mg, annotations.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    warn!(attempt, error = %e, "cannot record creation outcome, retrying");
                    tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn finalize(&self, mg: &mut M) -> Result<Action, ManagedError> {
        if meta::has_finalizer(mg) {
            let finalizers = meta::finalizers_without(mg);
            self.store.update_finalizers(mg, finalizers.clone()).await?;
            mg.meta_mut().finalizers = Some(finalizers);
        }
        info!("external resource gone, managed resource released");
        Ok(Action::await_change())
    }

    async fn record_failure(&self, mg: &mut M, error: &ManagedError) {
        metrics::increment_reconciliation_errors(error.reason());
        if error.is_fatal() {
            return;
        }
        mg.set_condition(Condition::reconcile_error(error.to_string()));
        if let Err(e) = self.store.update_status(mg).await {
            warn!(error = %e, "cannot record reconcile error in status");
        }
    }

    fn reset_backoff(&self, name: &str) {
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}
