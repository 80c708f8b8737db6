//! In-memory collaborators for the credentials controller tests

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use kube::ResourceExt;
use r2_credentials_controller::clients::{ProviderConfigSource, UsageTracker};
use r2_credentials_controller::cloudflare::{
    ApiError, ApiToken, CreateTokenRequest, PermissionGroup, TokenApi, TokenApiFactory,
};
use r2_credentials_controller::controller::credentials::permissions::{
    R2_READ_PERMISSION_GROUP, R2_WRITE_PERMISSION_GROUP,
};
use r2_credentials_controller::controller::credentials::{CredentialsConnector, CONTROLLER_NAME};
use r2_credentials_controller::crd::{
    Credentials, CredentialsParameters, CredentialsSource, CredentialsSpec, DeletionPolicy,
    ProviderConfigReference, ProviderConfigSpec, ProviderCredentials, R2Permission,
    SecretKeySelector, SecretReference, TypedReference,
};
use r2_credentials_controller::managed::{
    ConnectionDetails, ConnectionPublisher, GlobalRateLimiter, ManagedError, ManagedReconciler,
    ManagedStore, ReconcilerOptions,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ACCOUNT_ID: &str = "0123456789abcdef0123456789abcdef";
pub const ADMIN_TOKEN: &str = "cf-admin-token";

pub fn not_found() -> ApiError {
    ApiError::from_response(404, &["Could not find token".to_string()])
}

pub fn server_error() -> ApiError {
    ApiError::from_response(500, &["Internal Server Error".to_string()])
}

// ---------------------------------------------------------------------------
// Cloudflare token API
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FakeTokenState {
    pub catalog: Vec<PermissionGroup>,
    pub tokens: BTreeMap<String, ApiToken>,
    pub create_requests: Vec<CreateTokenRequest>,
    pub deleted: Vec<String>,
    pub list_calls: usize,
    pub get_calls: usize,
    pub list_error: Option<ApiError>,
    pub create_error: Option<ApiError>,
    pub get_error: Option<ApiError>,
    pub delete_error: Option<ApiError>,
    pub get_delay: Option<Duration>,
    /// Create responses carry no token value
    pub omit_value: bool,
    next_id: usize,
}

/// Token API backed by a map; records every call
#[derive(Debug, Default)]
pub struct FakeTokenApi {
    pub state: Mutex<FakeTokenState>,
}

pub fn permission_group(id: &str, name: &str) -> PermissionGroup {
    PermissionGroup {
        id: id.to_string(),
        name: name.to_string(),
        scopes: vec!["com.cloudflare.edge.r2.bucket".to_string()],
    }
}

impl FakeTokenApi {
    pub fn new() -> Arc<Self> {
        let api = Self::default();
        api.with_state(|s| {
            s.catalog = vec![
                permission_group("zone-read", "Zone Read"),
                permission_group("r2-write", R2_WRITE_PERMISSION_GROUP),
                permission_group("r2-read", R2_READ_PERMISSION_GROUP),
            ];
        });
        Arc::new(api)
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut FakeTokenState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn token_count(&self) -> usize {
        self.with_state(|s| s.tokens.len())
    }

    pub fn create_count(&self) -> usize {
        self.with_state(|s| s.create_requests.len())
    }
}

#[async_trait]
impl TokenApi for FakeTokenApi {
    async fn list_permission_groups(&self) -> Result<Vec<PermissionGroup>, ApiError> {
        self.with_state(|s| {
            s.list_calls += 1;
            match &s.list_error {
                Some(e) => Err(e.clone()),
                None => Ok(s.catalog.clone()),
            }
        })
    }

    async fn create_token(&self, request: &CreateTokenRequest) -> Result<ApiToken, ApiError> {
        self.with_state(|s| {
            if let Some(e) = &s.create_error {
                return Err(e.clone());
            }
            s.next_id += 1;
            s.create_requests.push(request.clone());
            let token = ApiToken {
                id: format!("tok-{}", s.next_id),
                name: Some(request.name.clone()),
                status: Some("active".to_string()),
                issued_on: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single(),
                value: None,
            };
            s.tokens.insert(token.id.clone(), token.clone());
            let value = (!s.omit_value).then(|| format!("secret-value-{}", s.next_id));
            Ok(ApiToken { value, ..token })
        })
    }

    async fn get_token(&self, id: &str) -> Result<ApiToken, ApiError> {
        let delay = self.with_state(|s| s.get_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|s| {
            s.get_calls += 1;
            if let Some(e) = &s.get_error {
                return Err(e.clone());
            }
            s.tokens.get(id).cloned().ok_or_else(not_found)
        })
    }

    async fn delete_token(&self, id: &str) -> Result<(), ApiError> {
        self.with_state(|s| {
            if let Some(e) = &s.delete_error {
                return Err(e.clone());
            }
            s.tokens.remove(id).ok_or_else(not_found)?;
            s.deleted.push(id.to_string());
            Ok(())
        })
    }
}

/// Hands out the shared fake and records the API tokens used
#[derive(Debug)]
pub struct FakeTokenApiFactory {
    pub api: Arc<FakeTokenApi>,
    pub api_tokens: Mutex<Vec<String>>,
}

impl TokenApiFactory for FakeTokenApiFactory {
    fn with_api_token(&self, api_token: &str) -> Arc<dyn TokenApi> {
        self.api_tokens.lock().unwrap().push(api_token.to_string());
        Arc::clone(&self.api) as Arc<dyn TokenApi>
    }
}

// ---------------------------------------------------------------------------
// Provider configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StaticProviderConfigs {
    pub configs: HashMap<String, ProviderConfigSpec>,
    pub secrets: HashMap<(String, String, String), Vec<u8>>,
}

impl StaticProviderConfigs {
    /// A `default` ProviderConfig reading `credentials` from a Secret
    pub fn with_credentials(credentials_json: &str) -> Self {
        let selector = SecretKeySelector {
            name: "cloudflare-creds".to_string(),
            namespace: "crossplane-system".to_string(),
            key: "credentials".to_string(),
        };
        let spec = ProviderConfigSpec {
            credentials: ProviderCredentials {
                source: CredentialsSource::Secret,
                secret_ref: Some(selector.clone()),
                env: None,
                fs: None,
            },
        };
        Self {
            configs: HashMap::from([("default".to_string(), spec)]),
            secrets: HashMap::from([(
                (selector.namespace, selector.name, selector.key),
                credentials_json.as_bytes().to_vec(),
            )]),
        }
    }

    pub fn admin() -> Self {
        Self::with_credentials(&format!(r#"{{"api_token": "{ADMIN_TOKEN}"}}"#))
    }
}

#[async_trait]
impl ProviderConfigSource for StaticProviderConfigs {
    async fn provider_config(&self, name: &str) -> Result<ProviderConfigSpec, ManagedError> {
        self.configs
            .get(name)
            .cloned()
            .ok_or_else(|| ManagedError::ConfigurationResolutionFailed {
                name: name.to_string(),
                message: "providerconfigs.cloudflare.crossplane.io not found".to_string(),
            })
    }

    async fn secret_key(&self, selector: &SecretKeySelector) -> Result<Vec<u8>, ManagedError> {
        self.secrets
            .get(&(
                selector.namespace.clone(),
                selector.name.clone(),
                selector.key.clone(),
            ))
            .cloned()
            .ok_or_else(|| ManagedError::CredentialExtractionFailed("secret not found".to_string()))
    }
}

#[derive(Debug, Default)]
pub struct RecordingUsageTracker {
    pub tracked: Mutex<Vec<(String, TypedReference)>>,
    pub fail: bool,
}

#[async_trait]
impl UsageTracker for RecordingUsageTracker {
    async fn track(
        &self,
        config: &ProviderConfigReference,
        consumer: &TypedReference,
    ) -> Result<(), ManagedError> {
        if self.fail {
            return Err(ManagedError::Store("usage apply rejected".to_string()));
        }
        self.tracked
            .lock()
            .unwrap()
            .push((config.name.clone(), consumer.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Managed resource store and publisher
// ---------------------------------------------------------------------------

/// Stands in for the API server copy of one `Credentials`
#[derive(Debug)]
pub struct InMemoryStore {
    object: Mutex<Credentials>,
    /// Scripted outcome of upcoming annotation writes; `true` fails the write
    pub annotation_failures: Mutex<VecDeque<bool>>,
    pub status_writes: Mutex<usize>,
}

impl InMemoryStore {
    pub fn new(cr: Credentials) -> Self {
        Self {
            object: Mutex::new(cr),
            annotation_failures: Mutex::new(VecDeque::new()),
            status_writes: Mutex::new(0),
        }
    }

    pub fn current(&self) -> Credentials {
        self.object.lock().unwrap().clone()
    }

    pub fn edit(&self, f: impl FnOnce(&mut Credentials)) {
        f(&mut self.object.lock().unwrap());
    }

    pub fn script_annotation_writes(&self, outcomes: &[bool]) {
        self.annotation_failures
            .lock()
            .unwrap()
            .extend(outcomes.iter().copied());
    }

    pub fn annotation(&self, key: &str) -> Option<String> {
        self.current().annotations().get(key).cloned()
    }
}

#[async_trait]
impl ManagedStore<Credentials> for InMemoryStore {
    async fn update_annotations(
        &self,
        _mg: &Credentials,
        annotations: BTreeMap<String, Option<String>>,
    ) -> Result<(), ManagedError> {
        let fail = self
            .annotation_failures
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(false);
        if fail {
            return Err(ManagedError::Store("conflict".to_string()));
        }
        self.edit(|stored| {
            let existing = stored.metadata.annotations.get_or_insert_with(BTreeMap::new);
            for (key, value) in annotations {
                match value {
                    Some(value) => existing.insert(key, value),
                    None => existing.remove(&key),
                };
            }
        });
        Ok(())
    }

    async fn update_finalizers(
        &self,
        _mg: &Credentials,
        finalizers: Vec<String>,
    ) -> Result<(), ManagedError> {
        self.edit(|stored| stored.metadata.finalizers = Some(finalizers));
        Ok(())
    }

    async fn update_status(&self, mg: &Credentials) -> Result<(), ManagedError> {
        *self.status_writes.lock().unwrap() += 1;
        self.edit(|stored| stored.status.clone_from(&mg.status));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<ConnectionDetails>>,
}

impl RecordingPublisher {
    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<ConnectionDetails> {
        self.published.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ConnectionPublisher<Credentials> for RecordingPublisher {
    async fn publish(
        &self,
        _mg: &Credentials,
        details: &ConnectionDetails,
    ) -> Result<(), ManagedError> {
        self.published.lock().unwrap().push(details.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn credentials(
    name: &str,
    bucket: Option<&str>,
    permissions: Vec<R2Permission>,
) -> Credentials {
    let mut cr = Credentials::new(
        name,
        CredentialsSpec {
            for_provider: CredentialsParameters {
                account_id: ACCOUNT_ID.to_string(),
                bucket_name: bucket.map(str::to_string),
                name: format!("{name}-token"),
                permissions,
            },
            provider_config_ref: Some(ProviderConfigReference::default()),
            write_connection_secret_to_ref: Some(SecretReference {
                name: format!("{name}-r2"),
                namespace: "apps".to_string(),
            }),
            deletion_policy: DeletionPolicy::Delete,
        },
    );
    cr.metadata.uid = Some(format!("uid-{name}"));
    cr
}

pub fn test_options() -> ReconcilerOptions {
    ReconcilerOptions {
        poll_interval: Duration::from_secs(60),
        timeout: Duration::from_secs(5),
        short_wait: Duration::from_secs(30),
        external_name_attempts: 3,
    }
}

/// The driver for one `Credentials` wired to in-memory collaborators
pub struct Harness {
    pub api: Arc<FakeTokenApi>,
    pub factory: Arc<FakeTokenApiFactory>,
    pub usage: Arc<RecordingUsageTracker>,
    pub store: Arc<InMemoryStore>,
    pub publisher: Arc<RecordingPublisher>,
    pub reconciler: Arc<ManagedReconciler<Credentials>>,
}

impl Harness {
    pub fn new(cr: Credentials) -> Self {
        Self::build(
            cr,
            StaticProviderConfigs::admin(),
            test_options(),
            Arc::new(GlobalRateLimiter::new(1000, 1000)),
        )
    }

    pub fn build(
        cr: Credentials,
        configs: StaticProviderConfigs,
        options: ReconcilerOptions,
        limiter: Arc<GlobalRateLimiter>,
    ) -> Self {
        let api = FakeTokenApi::new();
        let factory = Arc::new(FakeTokenApiFactory {
            api: Arc::clone(&api),
            api_tokens: Mutex::new(vec![]),
        });
        let usage = Arc::new(RecordingUsageTracker::default());
        let store = Arc::new(InMemoryStore::new(cr));
        let publisher = Arc::new(RecordingPublisher::default());
        let connector = CredentialsConnector::new(
            Arc::new(configs),
            Arc::clone(&usage) as Arc<dyn UsageTracker>,
            Arc::clone(&factory) as Arc<dyn TokenApiFactory>,
        );
        let reconciler = Arc::new(ManagedReconciler::new(
            CONTROLLER_NAME,
            Arc::new(connector),
            Arc::clone(&store) as Arc<dyn ManagedStore<Credentials>>,
            Arc::clone(&publisher) as Arc<dyn ConnectionPublisher<Credentials>>,
            limiter,
            options,
        ));
        Self {
            api,
            factory,
            usage,
            store,
            publisher,
            reconciler,
        }
    }

    /// Reconcile the stored copy once, as the controller would after a watch event
    pub async fn pass(&self) -> Result<kube_runtime::controller::Action, ManagedError> {
        let cr = self.store.current();
        self.reconciler.reconcile(&cr).await
    }

    /// Mark the stored copy as deleted
    pub fn request_deletion(&self) {
        self.store.edit(|stored| {
            stored.metadata.deletion_timestamp = Some(
                k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(Utc::now()),
            );
        });
    }
}
