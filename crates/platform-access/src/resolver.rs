//! Scope resolution
//!
//! Computes the effective role of a scope's identity on a resource by folding
//! the direct grants of every level from the organization root down to the
//! target. Inherited access is a floor: a lower grant on a descendant never
//! reduces what an ancestor grants. The `everyone` entry only counts on
//! documents.
//!
//! Every function here is generic over [`TreeRead`], so the same rules run
//! against a best-effort snapshot for reads and against the working copy of a
//! transaction for the checks that guard writes.

use platform_org::{PathLevel, ResourceId, ResourcePath, TreeRead};
use platform_rbac::{Principal, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{AccessError, AccessResult};
use crate::scope::Scope;

/// Effective role of the scope's identity on a resource.
///
/// Fails with `NotFound` when the resource does not exist. An identity that
/// appears in no ACL resolves to `Role::None`.
pub fn effective_role<R>(tree: &R, scope: &Scope, resource: &ResourceId) -> AccessResult<Role>
where
    R: TreeRead + ?Sized,
{
    let path = tree.path(resource)?;
    resolve_path(tree, scope, &path)
}

/// Effective role on the target of an already resolved path.
pub fn resolve_path<R>(tree: &R, scope: &Scope, path: &ResourcePath) -> AccessResult<Role>
where
    R: TreeRead + ?Sized,
{
    if let Some(role) = permit_role(tree, scope, path) {
        tracing::debug!(
            user = %scope.user_id(),
            target = %path.target().resource(),
            role = %role,
            "Special permit applied"
        );
        return Ok(role);
    }

    let mut role = Role::None;
    for level in path.levels() {
        let acl = tree.acl_at(level)?;
        let at_document = matches!(level, PathLevel::Document(_));
        role = role.max(acl.role_for(scope.identity(), at_document));
    }

    tracing::debug!(
        user = %scope.user_id(),
        target = %path.target().resource(),
        role = %role,
        "Resolved effective role"
    );
    Ok(role)
}

/// Role contributed by the levels strictly above the target.
pub fn inherited_role<R>(tree: &R, scope: &Scope, path: &ResourcePath) -> AccessResult<Role>
where
    R: TreeRead + ?Sized,
{
    let mut role = Role::None;
    for level in path.ancestors() {
        role = role.max(tree.acl_at(level)?.role_for(scope.identity(), false));
    }
    Ok(role)
}

/// Resolve and check a role threshold, returning the resource's path.
pub fn require_role<R>(
    tree: &R,
    scope: &Scope,
    resource: &ResourceId,
    required: Role,
) -> AccessResult<ResourcePath>
where
    R: TreeRead + ?Sized,
{
    let path = tree.path(resource)?;
    let actual = resolve_path(tree, scope, &path)?;
    if !actual.is_at_least(required) {
        return Err(AccessError::forbidden(resource.clone(), required, actual));
    }
    Ok(path)
}

fn permit_role<R>(tree: &R, scope: &Scope, path: &ResourcePath) -> Option<Role>
where
    R: TreeRead + ?Sized,
{
    let permit = scope.special_permit()?;
    // A permit naming a missing resource never matches.
    let permitted = tree.path(&permit.resource).ok()?;
    (permitted.target() == path.target()).then_some(permit.role)
}

/// Access held by one principal on a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrincipalAccess {
    /// The principal
    pub principal: Principal,
    /// Role granted directly on the resource
    pub direct: Role,
    /// Highest role granted on an ancestor
    pub inherited: Role,
    /// What the principal can actually do
    pub effective: Role,
}

/// Everyone with access to a resource, as listed to its viewers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessReport {
    /// The resource described
    pub resource: ResourceId,
    /// One row per principal named anywhere on the path, in principal order
    pub entries: Vec<PrincipalAccess>,
    /// Effective role of the caller
    pub caller_role: Role,
}

impl AccessReport {
    /// Row of a principal, if it has any access.
    pub fn entry(&self, principal: &Principal) -> Option<&PrincipalAccess> {
        self.entries.iter().find(|entry| entry.principal == *principal)
    }
}

/// Build the access report of a resource.
///
/// Requires the caller to be at least a viewer.
pub fn access_report<R>(tree: &R, scope: &Scope, resource: &ResourceId) -> AccessResult<AccessReport>
where
    R: TreeRead + ?Sized,
{
    let path = require_role(tree, scope, resource, Role::Viewer)?;
    let caller_role = resolve_path(tree, scope, &path)?;

    let target_acl = tree.acl_at(path.target())?;
    let ancestor_acls = path
        .ancestors()
        .into_iter()
        .map(|level| tree.acl_at(level))
        .collect::<Result<Vec<_>, _>>()?;

    let principals: BTreeSet<&Principal> = ancestor_acls
        .iter()
        .flat_map(|acl| acl.principals())
        .chain(target_acl.principals())
        .collect();

    let entries = principals
        .into_iter()
        .map(|principal| {
            let direct = target_acl.role_of(principal);
            let inherited = ancestor_acls
                .iter()
                .fold(Role::None, |acc, acl| acc.max(acl.role_of(principal)));
            PrincipalAccess {
                principal: principal.clone(),
                direct,
                inherited,
                effective: direct.max(inherited),
            }
        })
        .collect();

    Ok(AccessReport {
        resource: resource.clone(),
        entries,
        caller_role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::SpecialPermit;
    use platform_org::{
        DocId, Document, MemoryTreeStore, OrgId, Organization, Workspace, WorkspaceId,
    };
    use platform_rbac::{Identity, UserId};

    async fn tree() -> (MemoryTreeStore, OrgId, WorkspaceId, DocId) {
        let store = MemoryTreeStore::new();
        let mut txn = store.begin().await;
        let org = txn
            .insert_organization(Organization::new("Acme", Some("acme"), UserId(42)))
            .unwrap();
        let ws = txn
            .insert_workspace(Workspace::new(org, "Shared", UserId(42)))
            .unwrap();
        let doc = txn
            .insert_document(Document::new(ws, "Plan", UserId(42)))
            .unwrap();
        txn.commit().await;
        (store, org, ws, doc)
    }

    fn scope(user: i64) -> Scope {
        Scope::new(Identity::new(UserId(user)))
    }

    #[tokio::test]
    async fn test_org_grant_is_inherited() {
        let (store, org, ws, doc) = tree().await;
        let mut txn = store.begin().await;
        let mut acl = txn.acl(&org.into()).unwrap().clone();
        acl.set(Principal::User(UserId(7)), Role::Editor);
        txn.replace_acl(&org.into(), acl).unwrap();
        txn.commit().await;

        let snapshot = store.snapshot().await;
        assert_eq!(effective_role(&snapshot, &scope(7), &ws.into()).unwrap(), Role::Editor);
        assert_eq!(effective_role(&snapshot, &scope(7), &doc.into()).unwrap(), Role::Editor);
    }

    #[tokio::test]
    async fn test_lower_direct_grant_does_not_reduce_inherited() {
        let (store, _, ws, doc) = tree().await;
        let mut txn = store.begin().await;
        let mut acl = txn.acl(&doc.into()).unwrap().clone();
        acl.set(Principal::User(UserId(42)), Role::Viewer);
        txn.replace_acl(&doc.into(), acl).unwrap();
        txn.commit().await;

        let snapshot = store.snapshot().await;
        assert_eq!(effective_role(&snapshot, &scope(42), &doc.into()).unwrap(), Role::Owner);
        assert_eq!(effective_role(&snapshot, &scope(42), &ws.into()).unwrap(), Role::Owner);
    }

    #[tokio::test]
    async fn test_unknown_identity_resolves_to_none() {
        let (store, _, ws, _) = tree().await;
        let snapshot = store.snapshot().await;
        assert_eq!(effective_role(&snapshot, &scope(999), &ws.into()).unwrap(), Role::None);
        assert_eq!(
            effective_role(&snapshot, &Scope::anonymous(), &ws.into()).unwrap(),
            Role::None
        );
    }

    #[tokio::test]
    async fn test_missing_resource_is_not_found() {
        let (store, _, _, _) = tree().await;
        let snapshot = store.snapshot().await;
        let err = effective_role(&snapshot, &scope(42), &WorkspaceId(404).into()).unwrap_err();
        assert_eq!(err, AccessError::NotFound(WorkspaceId(404).into()));
    }

    #[tokio::test]
    async fn test_everyone_counts_only_on_documents() {
        let (store, _, ws, doc) = tree().await;
        let mut txn = store.begin().await;
        // Written through the store to bypass the applier's validation.
        let mut ws_acl = txn.acl(&ws.into()).unwrap().clone();
        ws_acl.set(Principal::Everyone, Role::Viewer);
        txn.replace_acl(&ws.into(), ws_acl).unwrap();
        txn.commit().await;

        let snapshot = store.snapshot().await;
        let anon = Scope::anonymous();
        assert_eq!(effective_role(&snapshot, &anon, &ws.into()).unwrap(), Role::None);
        assert_eq!(effective_role(&snapshot, &anon, &doc.into()).unwrap(), Role::None);
    }

    #[tokio::test]
    async fn test_permit_substitutes_only_on_named_resource() {
        let (store, org, ws, _) = tree().await;
        let snapshot = store.snapshot().await;

        let support = scope(5).with_special_permit(SpecialPermit::viewer(org));
        assert_eq!(effective_role(&snapshot, &support, &org.into()).unwrap(), Role::Viewer);
        assert_eq!(effective_role(&snapshot, &support, &ws.into()).unwrap(), Role::None);

        // Substitution, not max: an owner holding a viewer permit reads as viewer there.
        let owner = scope(42).with_special_permit(SpecialPermit::viewer(org));
        assert_eq!(effective_role(&snapshot, &owner, &org.into()).unwrap(), Role::Viewer);
        assert_eq!(effective_role(&snapshot, &owner, &ws.into()).unwrap(), Role::Owner);
    }

    #[tokio::test]
    async fn test_permit_by_domain_matches_org_by_id() {
        let (store, org, _, _) = tree().await;
        let snapshot = store.snapshot().await;
        let support = scope(5)
            .with_special_permit(SpecialPermit::viewer(ResourceId::Organization("acme".into())));
        assert_eq!(effective_role(&snapshot, &support, &org.into()).unwrap(), Role::Viewer);
    }

    #[tokio::test]
    async fn test_require_role_reports_both_roles() {
        let (store, _, ws, _) = tree().await;
        let snapshot = store.snapshot().await;
        let err = require_role(&snapshot, &scope(7), &ws.into(), Role::Editor).unwrap_err();
        assert_eq!(
            err,
            AccessError::Forbidden {
                resource: ws.into(),
                required: Role::Editor,
                actual: Role::None,
            }
        );
    }

    #[tokio::test]
    async fn test_access_report_splits_direct_and_inherited() {
        let (store, org, ws, _) = tree().await;
        let mut txn = store.begin().await;
        let mut org_acl = txn.acl(&org.into()).unwrap().clone();
        org_acl.set(Principal::User(UserId(7)), Role::Editor);
        txn.replace_acl(&org.into(), org_acl).unwrap();
        let mut ws_acl = txn.acl(&ws.into()).unwrap().clone();
        ws_acl.set(Principal::User(UserId(7)), Role::Viewer);
        ws_acl.set(Principal::email("new@example.com"), Role::Viewer);
        txn.replace_acl(&ws.into(), ws_acl).unwrap();
        txn.commit().await;

        let snapshot = store.snapshot().await;
        let report = access_report(&snapshot, &scope(7), &ws.into()).unwrap();
        assert_eq!(report.caller_role, Role::Editor);
        assert_eq!(report.entries.len(), 3);

        let seven = report.entry(&Principal::User(UserId(7))).unwrap();
        assert_eq!(
            (seven.direct, seven.inherited, seven.effective),
            (Role::Viewer, Role::Editor, Role::Editor)
        );

        let pending = report.entry(&Principal::email("new@example.com")).unwrap();
        assert_eq!(pending.inherited, Role::None);
        assert_eq!(pending.effective, Role::Viewer);
    }

    #[tokio::test]
    async fn test_access_report_requires_viewer() {
        let (store, org, _, _) = tree().await;
        let snapshot = store.snapshot().await;
        assert!(access_report(&snapshot, &scope(7), &org.into())
            .unwrap_err()
            .is_permission_denial());
    }
}
