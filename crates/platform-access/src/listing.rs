//! Read operations
//!
//! Lookups and listings filtered to what the caller may see. They run
//! against any [`TreeRead`], normally a best-effort snapshot.

use platform_org::{
    Child, DocId, Document, OrgKey, Organization, ParentRef, ResourceId, ResourcePath, TreeRead,
    Workspace, WorkspaceId,
};
use platform_rbac::Role;
use serde::{Deserialize, Serialize};

use crate::error::{AccessError, AccessResult};
use crate::resolver::{require_role, resolve_path};
use crate::scope::Scope;

/// Soft-deleted entries of an organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Trash {
    /// Workspaces in the trash
    pub workspaces: Vec<Workspace>,
    /// Documents whose own flag is set
    pub documents: Vec<Document>,
}

impl Trash {
    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty() && self.documents.is_empty()
    }
}

/// Fetch an organization the caller can view.
pub fn get_organization<R>(tree: &R, scope: &Scope, org: &OrgKey) -> AccessResult<Organization>
where
    R: TreeRead + ?Sized,
{
    require_role(tree, scope, &ResourceId::Organization(org.clone()), Role::Viewer)?;
    Ok(tree.get_organization(org)?.clone())
}

/// Fetch a workspace the caller can view.
pub fn get_workspace<R>(tree: &R, scope: &Scope, id: WorkspaceId) -> AccessResult<Workspace>
where
    R: TreeRead + ?Sized,
{
    require_role(tree, scope, &id.into(), Role::Viewer)?;
    Ok(tree.get_workspace(id)?.clone())
}

/// Fetch a document the caller can view.
pub fn get_document<R>(tree: &R, scope: &Scope, id: DocId) -> AccessResult<Document>
where
    R: TreeRead + ?Sized,
{
    require_role(tree, scope, &id.into(), Role::Viewer)?;
    Ok(tree.get_document(id)?.clone())
}

fn can_view<R>(tree: &R, scope: &Scope, path: &ResourcePath) -> AccessResult<bool>
where
    R: TreeRead + ?Sized,
{
    Ok(resolve_path(tree, scope, path)?.is_at_least(Role::Viewer))
}

fn visible_documents<R>(
    tree: &R,
    scope: &Scope,
    path: &ResourcePath,
    workspace: WorkspaceId,
    include_removed: bool,
) -> AccessResult<Vec<Document>>
where
    R: TreeRead + ?Sized,
{
    let mut docs = Vec::new();
    for child in tree.list_children(ParentRef::Workspace(workspace), include_removed) {
        if let Child::Document(doc) = child {
            if can_view(tree, scope, &ResourcePath::document(path.org, workspace, doc.id))? {
                docs.push(doc.clone());
            }
        }
    }
    Ok(docs)
}

/// Workspaces of an organization the caller can see.
///
/// A workspace is listed when the caller can view it or any document in it.
/// Fails with `Forbidden` when the caller can see nothing at all in the
/// organization.
pub fn list_workspaces<R>(
    tree: &R,
    scope: &Scope,
    org: &OrgKey,
    include_removed: bool,
) -> AccessResult<Vec<Workspace>>
where
    R: TreeRead + ?Sized,
{
    let resource = ResourceId::Organization(org.clone());
    let org_path = tree.path(&resource)?;
    let org_role = resolve_path(tree, scope, &org_path)?;

    let mut listed = Vec::new();
    for child in tree.list_children(ParentRef::Organization(org_path.org), include_removed) {
        let Child::Workspace(ws) = child else {
            continue;
        };
        let ws_path = ResourcePath::workspace(org_path.org, ws.id);
        let visible = can_view(tree, scope, &ws_path)?
            || !visible_documents(tree, scope, &ws_path, ws.id, include_removed)?.is_empty();
        if visible {
            listed.push(ws.clone());
        }
    }

    if listed.is_empty() && !org_role.grants_access() {
        return Err(AccessError::forbidden(resource, Role::Viewer, org_role));
    }
    Ok(listed)
}

/// Documents of a workspace the caller can view.
///
/// Documents of a workspace in the trash are only listed when
/// `include_removed` is set.
pub fn list_documents<R>(
    tree: &R,
    scope: &Scope,
    workspace: WorkspaceId,
    include_removed: bool,
) -> AccessResult<Vec<Document>>
where
    R: TreeRead + ?Sized,
{
    let resource = ResourceId::Workspace(workspace);
    let path = tree.path(&resource)?;
    let role = resolve_path(tree, scope, &path)?;
    let docs = visible_documents(tree, scope, &path, workspace, include_removed)?;
    if docs.is_empty() && !role.grants_access() {
        return Err(AccessError::forbidden(resource, Role::Viewer, role));
    }
    Ok(docs)
}

/// Soft-deleted workspaces and documents of an organization that the
/// caller owns.
///
/// Documents that are only hidden because their workspace is in the trash
/// are not listed; restoring the workspace brings them back.
pub fn list_trash<R>(tree: &R, scope: &Scope, org: &OrgKey) -> AccessResult<Trash>
where
    R: TreeRead + ?Sized,
{
    let org_path = tree.path(&ResourceId::Organization(org.clone()))?;
    let mut trash = Trash::default();

    for child in tree.list_children(ParentRef::Organization(org_path.org), true) {
        let Child::Workspace(ws) = child else {
            continue;
        };
        let ws_path = ResourcePath::workspace(org_path.org, ws.id);
        if ws.is_removed() && resolve_path(tree, scope, &ws_path)?.is_at_least(Role::Owner) {
            trash.workspaces.push(ws.clone());
        }
        for doc_child in tree.list_children(ParentRef::Workspace(ws.id), true) {
            let Child::Document(doc) = doc_child else {
                continue;
            };
            if !doc.is_removed() {
                continue;
            }
            let doc_path = ResourcePath::document(org_path.org, ws.id, doc.id);
            if resolve_path(tree, scope, &doc_path)?.is_at_least(Role::Owner) {
                trash.documents.push(doc.clone());
            }
        }
    }
    Ok(trash)
}

/// Organizations in which the caller can see anything.
pub fn list_organizations<R>(tree: &R, scope: &Scope) -> AccessResult<Vec<Organization>>
where
    R: TreeRead + ?Sized,
{
    let mut listed = Vec::new();
    for org in tree.organizations() {
        let key = OrgKey::Id(org.id);
        match list_workspaces(tree, scope, &key, false) {
            Ok(_) => listed.push(org.clone()),
            Err(err) if err.is_permission_denial() => {}
            Err(err) => return Err(err),
        }
    }
    Ok(listed)
}
