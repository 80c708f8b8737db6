//! Connect, observe, create, update and delete of `Credentials` against the fakes

use super::common::*;
use r2_credentials_controller::clients::UsageTracker;
use r2_credentials_controller::cloudflare::{ApiError, ApiErrorKind, TokenApi, TokenApiFactory};
use r2_credentials_controller::controller::credentials::secret::{
    r2_endpoint, sha256_hex, KEY_ACCESS_KEY_ID, KEY_ENDPOINT, KEY_SECRET_ACCESS_KEY,
    KEY_TOKEN_VALUE,
};
use r2_credentials_controller::controller::credentials::{CredentialsConnector, CredentialsExternal};
use r2_credentials_controller::crd::{
    get_condition, Credentials, ProviderConfigReference, R2Permission, TYPE_READY,
};
use r2_credentials_controller::managed::meta::{external_name, set_external_name};
use r2_credentials_controller::managed::{ExternalClient, ExternalConnecter, Managed, ManagedError};
use std::sync::{Arc, Mutex};

fn external(api: &Arc<FakeTokenApi>) -> CredentialsExternal {
    CredentialsExternal::new(Arc::clone(api) as Arc<dyn TokenApi>)
}

fn bound(name: &str, token_id: &str) -> Credentials {
    let mut cr = credentials(name, None, vec![]);
    set_external_name(&mut cr, token_id);
    cr
}

fn connector(
    configs: StaticProviderConfigs,
    usage: &Arc<RecordingUsageTracker>,
    api: &Arc<FakeTokenApi>,
) -> (CredentialsConnector, Arc<FakeTokenApiFactory>) {
    let factory = Arc::new(FakeTokenApiFactory {
        api: Arc::clone(api),
        api_tokens: Mutex::new(vec![]),
    });
    let connector = CredentialsConnector::new(
        Arc::new(configs),
        Arc::clone(usage) as Arc<dyn UsageTracker>,
        Arc::clone(&factory) as Arc<dyn TokenApiFactory>,
    );
    (connector, factory)
}

fn unwrap_authentication(error: ManagedError) -> ManagedError {
    match error {
        ManagedError::AuthenticationUnavailable(inner) => *inner,
        other => panic!("expected AuthenticationUnavailable, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// observe
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_observe_without_external_name_reports_absent() {
    let api = FakeTokenApi::new();
    let mut cr = credentials("unbound", None, vec![]);

    let observation = external(&api).observe(&mut cr).await.unwrap();

    assert!(!observation.resource_exists);
    assert_eq!(api.with_state(|s| s.get_calls), 0);
}

#[tokio::test]
async fn test_observe_existing_token_fills_status() {
    let api = FakeTokenApi::new();
    let mut cr = credentials("media", Some("media"), vec![R2Permission::Read]);
    let creation = external(&api).create(&mut cr).await.unwrap();
    assert!(!creation.connection_details.is_empty());

    let observation = external(&api).observe(&mut cr).await.unwrap();

    assert!(observation.resource_exists);
    assert!(observation.resource_up_to_date);
    assert!(observation.connection_details.is_empty());

    let status = cr.status.as_ref().unwrap();
    assert_eq!(status.at_provider.token_id.as_deref(), Some("tok-1"));
    assert_eq!(status.at_provider.status.as_deref(), Some("active"));
    assert_eq!(
        status.at_provider.issued_on.as_deref(),
        Some("2024-05-01T12:00:00+00:00")
    );
    assert_eq!(
        status.at_provider.endpoint.as_deref(),
        Some(r2_endpoint(ACCOUNT_ID).as_str())
    );

    let ready = get_condition(cr.conditions(), TYPE_READY).unwrap();
    assert_eq!(ready.status, "True");
    assert_eq!(ready.reason.as_deref(), Some("Available"));
}

#[tokio::test]
async fn test_observe_disabled_token_is_unavailable() {
    let api = FakeTokenApi::new();
    let mut cr = credentials("media", None, vec![]);
    external(&api).create(&mut cr).await.unwrap();
    api.with_state(|s| {
        if let Some(token) = s.tokens.get_mut("tok-1") {
            token.status = Some("disabled".to_string());
        }
    });

    let observation = external(&api).observe(&mut cr).await.unwrap();

    assert!(observation.resource_exists);
    assert!(observation.resource_up_to_date);
    let ready = get_condition(cr.conditions(), TYPE_READY).unwrap();
    assert_eq!(ready.status, "False");
    assert_eq!(ready.reason.as_deref(), Some("Unavailable"));
    assert_eq!(
        cr.status.as_ref().unwrap().at_provider.status.as_deref(),
        Some("disabled")
    );
}

#[tokio::test]
async fn test_observe_missing_token_reports_absent() {
    let api = FakeTokenApi::new();
    let mut cr = bound("revoked", "tok-gone");

    let observation = external(&api).observe(&mut cr).await.unwrap();

    assert!(!observation.resource_exists);
    assert_eq!(api.with_state(|s| s.get_calls), 1);
}

#[tokio::test]
async fn test_observe_server_error_is_fetch_failure() {
    let api = FakeTokenApi::new();
    api.with_state(|s| s.get_error = Some(server_error()));
    let mut cr = bound("flaky", "tok-1");

    let error = external(&api).observe(&mut cr).await.unwrap_err();

    match error {
        ManagedError::TokenFetchFailed(api_error) => {
            assert_eq!(api_error.kind, ApiErrorKind::Transient);
            assert_eq!(api_error.message, "HTTP status 500: Internal Server Error");
        }
        other => panic!("expected TokenFetchFailed, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_bucket_scoped_read_token() {
    let api = FakeTokenApi::new();
    let mut cr = credentials("media", Some("media"), vec![R2Permission::Read]);

    let creation = external(&api).create(&mut cr).await.unwrap();

    let request = api.with_state(|s| s.create_requests[0].clone());
    assert_eq!(request.name, "media-token");
    assert_eq!(request.policies.len(), 1);
    let policy = &request.policies[0];
    assert_eq!(policy.effect, "allow");
    let scope = format!("com.cloudflare.edge.r2.bucket.{ACCOUNT_ID}_default_media");
    assert_eq!(policy.resources.len(), 1);
    assert_eq!(policy.resources[&scope], "*");
    let group_ids: Vec<&str> = policy
        .permission_groups
        .iter()
        .map(|g| g.id.as_str())
        .collect();
    assert_eq!(group_ids, vec!["r2-read"]);

    assert_eq!(external_name(&cr), Some("tok-1"));

    let details = creation.connection_details;
    assert_eq!(details.len(), 4);
    assert_eq!(details[KEY_ACCESS_KEY_ID], b"tok-1".to_vec());
    assert_eq!(details[KEY_TOKEN_VALUE], b"secret-value-1".to_vec());
    assert_eq!(
        details[KEY_SECRET_ACCESS_KEY],
        sha256_hex("secret-value-1").into_bytes()
    );
    assert_eq!(details[KEY_ENDPOINT], r2_endpoint(ACCOUNT_ID).into_bytes());
}

#[tokio::test]
async fn test_create_without_token_value_publishes_every_key() {
    let api = FakeTokenApi::new();
    api.with_state(|s| s.omit_value = true);
    let mut cr = credentials("media", Some("media"), vec![R2Permission::Read]);

    let creation = external(&api).create(&mut cr).await.unwrap();

    assert_eq!(external_name(&cr), Some("tok-1"));
    let details = creation.connection_details;
    assert_eq!(details.len(), 4);
    assert_eq!(details[KEY_ACCESS_KEY_ID], b"tok-1".to_vec());
    assert!(details[KEY_TOKEN_VALUE].is_empty());
    assert_eq!(details[KEY_SECRET_ACCESS_KEY], sha256_hex("").into_bytes());
    assert_eq!(details[KEY_ENDPOINT], r2_endpoint(ACCOUNT_ID).into_bytes());
}

#[tokio::test]
async fn test_create_without_permissions_grants_read_and_write() {
    let api = FakeTokenApi::new();
    let mut cr = credentials("account-wide", None, vec![]);

    external(&api).create(&mut cr).await.unwrap();

    let request = api.with_state(|s| s.create_requests[0].clone());
    let policy = &request.policies[0];
    let scope = format!("com.cloudflare.api.account.{ACCOUNT_ID}");
    assert_eq!(policy.resources[&scope], "*");
    let group_ids: Vec<&str> = policy
        .permission_groups
        .iter()
        .map(|g| g.id.as_str())
        .collect();
    // catalog order, not request order
    assert_eq!(group_ids, vec!["r2-write", "r2-read"]);
}

#[tokio::test]
async fn test_create_without_matching_groups_issues_nothing() {
    let api = FakeTokenApi::new();
    api.with_state(|s| s.catalog = vec![permission_group("zone-read", "Zone Read")]);
    let mut cr = credentials("nogroups", None, vec![R2Permission::Write]);

    let error = external(&api).create(&mut cr).await.unwrap_err();

    assert!(matches!(error, ManagedError::NoMatchingPermissionGroups));
    assert_eq!(api.create_count(), 0);
    assert_eq!(external_name(&cr), None);
}

#[tokio::test]
async fn test_create_with_failing_catalog_lookup() {
    let api = FakeTokenApi::new();
    api.with_state(|s| s.list_error = Some(server_error()));
    let mut cr = credentials("nocatalog", None, vec![]);

    let error = external(&api).create(&mut cr).await.unwrap_err();

    assert!(matches!(error, ManagedError::PermissionGroupLookupFailed(_)));
    assert_eq!(api.create_count(), 0);
}

#[tokio::test]
async fn test_create_rejected_leaves_resource_unbound() {
    let api = FakeTokenApi::new();
    api.with_state(|s| {
        s.create_error = Some(
            ApiError::from_response(403, &["Unauthorized to access requested resource".to_string()]),
        );
    });
    let mut cr = credentials("forbidden", None, vec![]);

    let error = external(&api).create(&mut cr).await.unwrap_err();

    match error {
        ManagedError::TokenCreationFailed(api_error) => {
            assert_eq!(api_error.kind, ApiErrorKind::Fatal);
        }
        other => panic!("expected TokenCreationFailed, got {other:?}"),
    }
    assert_eq!(external_name(&cr), None);
}

// ---------------------------------------------------------------------------
// update and delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_update_never_touches_the_api() {
    let api = FakeTokenApi::new();
    let cr = bound("static", "tok-1");

    let update = external(&api).update(&cr).await.unwrap();

    assert!(update.connection_details.is_empty());
    assert_eq!(api.with_state(|s| s.get_calls + s.list_calls), 0);
    assert_eq!(api.create_count(), 0);
}

#[tokio::test]
async fn test_delete_unbound_is_noop() {
    let api = FakeTokenApi::new();
    let cr = credentials("unbound", None, vec![]);

    external(&api).delete(&cr).await.unwrap();

    assert!(api.with_state(|s| s.deleted.is_empty()));
}

#[tokio::test]
async fn test_delete_revokes_token() {
    let api = FakeTokenApi::new();
    let mut cr = credentials("media", None, vec![]);
    external(&api).create(&mut cr).await.unwrap();

    external(&api).delete(&cr).await.unwrap();

    assert_eq!(api.with_state(|s| s.deleted.clone()), vec!["tok-1"]);
    assert_eq!(api.token_count(), 0);
}

#[tokio::test]
async fn test_delete_missing_token_succeeds() {
    let api = FakeTokenApi::new();
    let cr = bound("revoked", "tok-gone");

    external(&api).delete(&cr).await.unwrap();
}

#[tokio::test]
async fn test_delete_failure_is_reported() {
    let api = FakeTokenApi::new();
    api.with_state(|s| s.delete_error = Some(server_error()));
    let cr = bound("flaky", "tok-1");

    let error = external(&api).delete(&cr).await.unwrap_err();

    assert!(matches!(error, ManagedError::TokenDeletionFailed(_)));
}

// ---------------------------------------------------------------------------
// connect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_connect_uses_api_token_and_tracks_usage() {
    let api = FakeTokenApi::new();
    let usage = Arc::new(RecordingUsageTracker::default());
    let (connector, factory) = connector(StaticProviderConfigs::admin(), &usage, &api);
    let cr = credentials("media", None, vec![]);

    let client = connector.connect(&cr).await.unwrap();
    client.disconnect().await.unwrap();

    assert_eq!(*factory.api_tokens.lock().unwrap(), vec![ADMIN_TOKEN]);
    let tracked = usage.tracked.lock().unwrap().clone();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].0, "default");
    assert_eq!(tracked[0].1.kind, "Credentials");
    assert_eq!(tracked[0].1.name, "media");
    assert_eq!(tracked[0].1.uid.as_deref(), Some("uid-media"));
}

#[tokio::test]
async fn test_connect_without_provider_config_ref() {
    let api = FakeTokenApi::new();
    let usage = Arc::new(RecordingUsageTracker::default());
    let (connector, factory) = connector(StaticProviderConfigs::admin(), &usage, &api);
    let mut cr = credentials("orphaned", None, vec![]);
    cr.spec.provider_config_ref = None;

    let error = connector.connect(&cr).await.err().unwrap();

    assert!(matches!(
        unwrap_authentication(error),
        ManagedError::ConfigurationMissing
    ));
    assert!(factory.api_tokens.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_connect_with_unknown_provider_config() {
    let api = FakeTokenApi::new();
    let usage = Arc::new(RecordingUsageTracker::default());
    let (connector, _factory) = connector(StaticProviderConfigs::admin(), &usage, &api);
    let mut cr = credentials("misconfigured", None, vec![]);
    cr.spec.provider_config_ref = Some(ProviderConfigReference {
        name: "staging".to_string(),
    });

    let error = connector.connect(&cr).await.err().unwrap();

    match unwrap_authentication(error) {
        ManagedError::ConfigurationResolutionFailed { name, .. } => assert_eq!(name, "staging"),
        other => panic!("expected ConfigurationResolutionFailed, got {other:?}"),
    }
    assert!(usage.tracked.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_connect_with_failing_usage_tracker() {
    let api = FakeTokenApi::new();
    let usage = Arc::new(RecordingUsageTracker {
        fail: true,
        ..Default::default()
    });
    let (connector, factory) = connector(StaticProviderConfigs::admin(), &usage, &api);
    let cr = credentials("untracked", None, vec![]);

    let error = connector.connect(&cr).await.err().unwrap();

    match unwrap_authentication(error) {
        ManagedError::ConfigurationResolutionFailed { message, .. } => {
            assert!(message.starts_with("cannot track ProviderConfig usage"));
        }
        other => panic!("expected ConfigurationResolutionFailed, got {other:?}"),
    }
    assert!(factory.api_tokens.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_connect_with_legacy_key_only() {
    let api = FakeTokenApi::new();
    let usage = Arc::new(RecordingUsageTracker::default());
    let configs = StaticProviderConfigs::with_credentials(
        r#"{"email": "ops@example.com", "api_key": "global-key"}"#,
    );
    let (connector, factory) = connector(configs, &usage, &api);
    let cr = credentials("legacy", None, vec![]);

    let error = connector.connect(&cr).await.err().unwrap();

    assert!(matches!(
        unwrap_authentication(error),
        ManagedError::NoUsableCredential
    ));
    assert!(factory.api_tokens.lock().unwrap().is_empty());
}
