//! # R2 Permission Groups
//!
//! Maps the abstract read/write permissions of a `Credentials` resource onto
//! Cloudflare permission groups.

use crate::cloudflare::{PermissionGroup, PermissionGroupRef, TokenApi};
use crate::crd::R2Permission;
use crate::managed::ManagedError;

/// Permission group granting object reads in R2 buckets
pub const R2_READ_PERMISSION_GROUP: &str = "Workers R2 Storage Bucket Item Read";
/// Permission group granting object writes in R2 buckets
pub const R2_WRITE_PERMISSION_GROUP: &str = "Workers R2 Storage Bucket Item Write";

/// Select the R2 groups wanted by `permissions`, in catalog order
///
/// An empty permission list wants both read and write. Names must match exactly.
#[must_use]
pub fn select_r2_permission_groups(
    catalog: &[PermissionGroup],
    permissions: &[R2Permission],
) -> Vec<PermissionGroupRef> {
    let want_read = permissions.is_empty() || permissions.contains(&R2Permission::Read);
    let want_write = permissions.is_empty() || permissions.contains(&R2Permission::Write);

    catalog
        .iter()
        .filter(|group| {
            (want_read && group.name == R2_READ_PERMISSION_GROUP)
                || (want_write && group.name == R2_WRITE_PERMISSION_GROUP)
        })
        .map(PermissionGroupRef::from)
        .collect()
}

/// Fetch the catalog and select the wanted R2 groups
///
/// # Errors
///
/// `PermissionGroupLookupFailed` if the catalog cannot be listed,
/// `NoMatchingPermissionGroups` if no wanted group is present.
pub async fn lookup_r2_permission_groups(
    api: &dyn TokenApi,
    permissions: &[R2Permission],
) -> Result<Vec<PermissionGroupRef>, ManagedError> {
    let catalog = api
        .list_permission_groups()
        .await
        .map_err(ManagedError::PermissionGroupLookupFailed)?;

    let groups = select_r2_permission_groups(&catalog, permissions);
    if groups.is_empty() {
        return Err(ManagedError::NoMatchingPermissionGroups);
    }
    Ok(groups)
}
