//! Privileged-view retry
//!
//! Support and install-admin users may look at an organization they were
//! never granted. Rather than giving them a standing role, a denied call is
//! re-run exactly once with a scope carrying a viewer [`SpecialPermit`] for
//! the one resource involved. The permit replaces whatever role the user
//! already holds there, so it is only added after a denial.
//!
//! # Example
//!
//! ```rust,no_run
//! use platform_access::{listing, with_privileged_retry, AccessConfig, Scope};
//! use platform_org::{MemoryTreeStore, OrgKey};
//! use platform_rbac::{Identity, UserId};
//!
//! async fn example(store: MemoryTreeStore) {
//!     let config = AccessConfig::default();
//!     let support = Scope::new(Identity::new(UserId(5)).as_support());
//!     let org = OrgKey::from("acme");
//!     let snapshot = store.snapshot().await;
//!
//!     let found = with_privileged_retry(&config, &support, org.clone(), |scope| {
//!         let result = listing::get_organization(&snapshot, &scope, &org);
//!         async move { result }
//!     })
//!     .await;
//!     assert!(found.is_ok());
//! }
//! ```

use platform_org::ResourceId;
use std::future::Future;

use crate::config::AccessConfig;
use crate::error::AccessResult;
use crate::scope::{Scope, SpecialPermit};

/// Run `op`, retrying once with a viewer permit on `resource` when it is
/// denied and the caller is a support user or install admin.
///
/// Any other failure, and every failure of a regular user, is returned as
/// is. The elevated scope exists only for the retried call.
pub async fn with_privileged_retry<T, F, Fut>(
    config: &AccessConfig,
    scope: &Scope,
    resource: impl Into<ResourceId>,
    op: F,
) -> AccessResult<T>
where
    F: Fn(Scope) -> Fut,
    Fut: Future<Output = AccessResult<T>>,
{
    let err = match op(scope.clone()).await {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    if !err.is_permission_denial() || !config.is_privileged(scope.identity()) {
        return Err(err);
    }

    let resource = resource.into();
    tracing::warn!(
        user = %scope.user_id(),
        resource = %resource,
        "Retrying denied request with a privileged view"
    );
    op(scope.with_special_permit(SpecialPermit::viewer(resource))).await
}
