//! # Managed Resource Metadata
//!
//! Annotation and finalizer helpers for managed resources.
//!
//! The external name links a managed resource to its external counterpart.
//! The `external-create-*` annotations are written around every create call so
//! that a creation whose result was never recorded is detected on the next pass
//! instead of being repeated.

use chrono::{DateTime, SecondsFormat, Utc};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

/// Identifier of the external resource
pub const ANNOTATION_EXTERNAL_NAME: &str = "crossplane.io/external-name";
/// Written immediately before a create call
pub const ANNOTATION_EXTERNAL_CREATE_PENDING: &str = "crossplane.io/external-create-pending";
/// Written after a create call returned successfully
pub const ANNOTATION_EXTERNAL_CREATE_SUCCEEDED: &str = "crossplane.io/external-create-succeeded";
/// Written after a create call returned an error
pub const ANNOTATION_EXTERNAL_CREATE_FAILED: &str = "crossplane.io/external-create-failed";

/// Blocks removal of the managed resource until the external resource is gone
pub const FINALIZER: &str = "finalizer.managedresource.crossplane.io";

/// External name of the resource, if one has been recorded
pub fn external_name<K: Resource>(obj: &K) -> Option<&str> {
    obj.annotations()
        .get(ANNOTATION_EXTERNAL_NAME)
        .map(String::as_str)
        .filter(|name| !name.is_empty())
}

/// Record the external name on the in-memory object
pub fn set_external_name<K: Resource>(obj: &mut K, name: &str) {
    set_annotation(obj, ANNOTATION_EXTERNAL_NAME, name);
}

/// Set an annotation on the in-memory object
pub fn set_annotation<K: Resource>(obj: &mut K, key: &str, value: &str) {
    obj.meta_mut()
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(key.to_string(), value.to_string());
}

/// Current time in the format used by the creation annotations
#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn annotation_time<K: Resource>(obj: &K, key: &str) -> Option<DateTime<Utc>> {
    obj.annotations()
        .get(key)
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|time| time.with_timezone(&Utc))
}

/// A create call started but its outcome was never recorded
///
/// True when the pending timestamp is newer than both the succeeded and the
/// failed timestamps. Unparseable timestamps count as absent.
pub fn external_create_incomplete<K: Resource>(obj: &K) -> bool {
    let Some(pending) = annotation_time(obj, ANNOTATION_EXTERNAL_CREATE_PENDING) else {
        return false;
    };
    let succeeded = annotation_time(obj, ANNOTATION_EXTERNAL_CREATE_SUCCEEDED);
    let failed = annotation_time(obj, ANNOTATION_EXTERNAL_CREATE_FAILED);

    succeeded.is_none_or(|t| pending > t) && failed.is_none_or(|t| pending > t)
}

/// Deletion has been requested
pub fn is_deleting<K: Resource>(obj: &K) -> bool {
    obj.meta().deletion_timestamp.is_some()
}

/// The managed-resource finalizer is present
pub fn has_finalizer<K: Resource>(obj: &K) -> bool {
    obj.finalizers().iter().any(|f| f == FINALIZER)
}

/// Finalizer list with the managed-resource finalizer appended
pub fn finalizers_with<K: Resource>(obj: &K) -> Vec<String> {
    let mut finalizers = obj.finalizers().to_vec();
    if !finalizers.iter().any(|f| f == FINALIZER) {
        finalizers.push(FINALIZER.to_string());
    }
    finalizers
}

/// Finalizer list with the managed-resource finalizer removed
pub fn finalizers_without<K: Resource>(obj: &K) -> Vec<String> {
    obj.finalizers()
        .iter()
        .filter(|f| *f != FINALIZER)
        .cloned()
        .collect()
}
