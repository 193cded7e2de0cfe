//! Resource lifecycle
//!
//! Create, rename, move, trash, restore and permanently delete operations
//! over the tree, plus the document flags (pinned, type). Each operation
//! checks the caller's role against the working copy of the transaction it
//! is given and returns an [`Outcome`]: the result value and, when something
//! actually changed, the audit event to publish once the transaction commits.
//!
//! Workspaces and documents move through
//! `Active -> SoftDeleted -> {Active, PermanentlyDeleted}`. Trashing a
//! workspace hides its documents through the ancestor check without touching
//! their own flags, and restoring only ever clears the flag of the resource
//! named. Organizations have no trash.

use chrono::Utc;
use platform_events::{AuditAction, Event};
use platform_org::{
    CascadeCounts, DocId, DocType, Document, OrgId, OrgKey, Organization, ResourceId,
    ResourceKind, ResourceSummary, TreeRead, TreeTransaction, Workspace, WorkspaceId,
};
use platform_rbac::Role;
use serde::{Deserialize, Serialize};

use crate::delta::{apply_delta, AccessChanges, PermissionDelta};
use crate::error::{AccessError, AccessResult};
use crate::resolver::require_role;
use crate::scope::Scope;

/// Result of a mutation and the audit event describing it.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    /// Operation result
    pub value: T,
    /// Event to publish after commit, `None` when nothing changed
    pub audit: Option<Event>,
}

impl<T> Outcome<T> {
    /// A mutation that changed the tree.
    pub fn changed(value: T, audit: Event) -> Self {
        Self {
            value,
            audit: Some(audit),
        }
    }

    /// A request that left the tree as it was.
    pub fn unchanged(value: T) -> Self {
        Self { value, audit: None }
    }

    /// Check if the tree changed.
    pub fn is_changed(&self) -> bool {
        self.audit.is_some()
    }
}

/// Name of a resource before and after a rename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Renamed {
    /// Previous name
    pub previous: String,
    /// Current name
    pub current: String,
}

/// Parent workspaces of a moved document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Moved {
    /// The document
    pub document: DocId,
    /// Workspace it left
    pub from: WorkspaceId,
    /// Workspace it now lives in
    pub to: WorkspaceId,
}

fn audit(scope: &Scope, action: AuditAction, org: OrgId, resource: ResourceSummary) -> Event {
    let event = action.to_event().with_org(org).with_resource(resource);
    if scope.identity().is_anonymous() {
        event
    } else {
        event.with_actor(scope.user_id())
    }
}

fn summary<R: TreeRead + ?Sized>(tree: &R, resource: &ResourceId) -> AccessResult<ResourceSummary> {
    Ok(match resource {
        ResourceId::Organization(key) => tree.get_organization(key)?.summary(),
        ResourceId::Workspace(id) => tree.get_workspace(*id)?.summary(),
        ResourceId::Document(id) => tree.get_document(*id)?.summary(),
    })
}

fn require_user(scope: &Scope) -> AccessResult<()> {
    if scope.identity().is_anonymous() {
        return Err(AccessError::Unauthenticated);
    }
    Ok(())
}

fn validate_name(name: &str) -> AccessResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AccessError::InvalidInput("name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

fn validate_domain(domain: &str) -> AccessResult<String> {
    let domain = domain.trim().to_lowercase();
    let well_formed = !domain.is_empty()
        && !domain.starts_with('-')
        && !domain.ends_with('-')
        && domain
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !well_formed {
        return Err(AccessError::InvalidInput(format!("invalid domain: {}", domain)));
    }
    Ok(domain)
}

fn reject_organization(resource: &ResourceId, what: &str) -> AccessResult<()> {
    if resource.kind() == ResourceKind::Organization {
        return Err(AccessError::InvalidInput(format!(
            "organizations cannot be {}",
            what
        )));
    }
    Ok(())
}

/// Create an organization owned by the caller.
pub fn create_organization(
    txn: &mut TreeTransaction,
    scope: &Scope,
    name: &str,
    domain: Option<&str>,
) -> AccessResult<Outcome<OrgId>> {
    require_user(scope)?;
    let name = validate_name(name)?;
    let domain = domain.map(validate_domain).transpose()?;

    let org = Organization::new(name, domain.as_deref(), scope.user_id());
    let id = txn.insert_organization(org)?;
    let event = audit(scope, AuditAction::SiteCreate, id, summary(&*txn, &id.into())?);
    Ok(Outcome::changed(id, event))
}

/// Create a workspace under an organization; the caller needs editor access.
pub fn create_workspace(
    txn: &mut TreeTransaction,
    scope: &Scope,
    org: &OrgKey,
    name: &str,
) -> AccessResult<Outcome<WorkspaceId>> {
    require_user(scope)?;
    let path = require_role(&*txn, scope, &ResourceId::Organization(org.clone()), Role::Editor)?;
    let name = validate_name(name)?;

    let id = txn.insert_workspace(Workspace::new(path.org, name, scope.user_id()))?;
    let event = audit(
        scope,
        AuditAction::WorkspaceCreate,
        path.org,
        summary(&*txn, &id.into())?,
    );
    Ok(Outcome::changed(id, event))
}

/// Create a document in a workspace; the caller needs editor access.
pub fn create_document(
    txn: &mut TreeTransaction,
    scope: &Scope,
    workspace: WorkspaceId,
    name: &str,
    doc_type: DocType,
) -> AccessResult<Outcome<DocId>> {
    require_user(scope)?;
    let path = require_role(&*txn, scope, &workspace.into(), Role::Editor)?;
    if txn.is_effectively_removed(&workspace.into())? {
        return Err(AccessError::AlreadyDeleted(workspace.into()));
    }
    let name = validate_name(name)?;

    let doc = Document::new(workspace, name, scope.user_id()).with_type(doc_type);
    let id = txn.insert_document(doc)?;
    let event = audit(
        scope,
        AuditAction::DocumentCreate,
        path.org,
        summary(&*txn, &id.into())?,
    );
    Ok(Outcome::changed(id, event))
}

/// Rename any resource; the caller needs editor access.
pub fn rename(
    txn: &mut TreeTransaction,
    scope: &Scope,
    resource: &ResourceId,
    name: &str,
) -> AccessResult<Outcome<Renamed>> {
    let path = require_role(&*txn, scope, resource, Role::Editor)?;
    if txn.is_effectively_removed(resource)? {
        return Err(AccessError::AlreadyDeleted(resource.clone()));
    }
    let name = validate_name(name)?;
    let now = Utc::now();

    let previous = match resource {
        ResourceId::Organization(key) => {
            let org = txn.organization_mut(key)?;
            let previous = std::mem::replace(&mut org.name, name.clone());
            if previous != name {
                org.updated_at = now;
            }
            previous
        }
        ResourceId::Workspace(id) => {
            let ws = txn.workspace_mut(*id)?;
            let previous = std::mem::replace(&mut ws.name, name.clone());
            if previous != name {
                ws.updated_at = now;
            }
            previous
        }
        ResourceId::Document(id) => {
            let doc = txn.document_mut(*id)?;
            let previous = std::mem::replace(&mut doc.name, name.clone());
            if previous != name {
                doc.updated_at = now;
            }
            previous
        }
    };

    let renamed = Renamed {
        previous,
        current: name,
    };
    if renamed.previous == renamed.current {
        return Ok(Outcome::unchanged(renamed));
    }
    let event = audit(
        scope,
        AuditAction::rename(resource.kind()),
        path.org,
        summary(&*txn, resource)?,
    )
    .with_change(&renamed.previous, &renamed.current);
    Ok(Outcome::changed(renamed, event))
}

/// Move a document to another workspace of the same organization.
///
/// The caller needs editor access on both workspaces. The document keeps
/// its ACL; only the parent link changes. Moving to the current workspace
/// changes nothing.
pub fn move_document(
    txn: &mut TreeTransaction,
    scope: &Scope,
    document: DocId,
    destination: WorkspaceId,
) -> AccessResult<Outcome<Moved>> {
    let source = txn.get_document(document)?.workspace_id;
    let from = require_role(&*txn, scope, &source.into(), Role::Editor)?;
    let to = require_role(&*txn, scope, &destination.into(), Role::Editor)?;
    if txn.is_effectively_removed(&document.into())? {
        return Err(AccessError::AlreadyDeleted(document.into()));
    }
    if txn.is_effectively_removed(&destination.into())? {
        return Err(AccessError::AlreadyDeleted(destination.into()));
    }
    if from.org != to.org {
        return Err(AccessError::CrossOrganizationMove {
            document,
            from: from.org,
            to: to.org,
        });
    }

    let moved = Moved {
        document,
        from: source,
        to: destination,
    };
    if source == destination {
        return Ok(Outcome::unchanged(moved));
    }

    let previous = summary(&*txn, &source.into())?;
    let current = summary(&*txn, &destination.into())?;
    let doc = txn.document_mut(document)?;
    doc.workspace_id = destination;
    doc.updated_at = Utc::now();

    tracing::debug!(%document, from = %source, to = %destination, "Document moved");
    let event = audit(
        scope,
        AuditAction::DocumentMove,
        to.org,
        summary(&*txn, &document.into())?,
    )
    .with_change(&previous, &current);
    Ok(Outcome::changed(moved, event))
}

/// Move a workspace or document to the trash; the caller needs owner access.
pub fn soft_delete(
    txn: &mut TreeTransaction,
    scope: &Scope,
    resource: &ResourceId,
) -> AccessResult<Outcome<()>> {
    reject_organization(resource, "moved to the trash")?;
    let path = require_role(&*txn, scope, resource, Role::Owner)?;
    set_removed(txn, resource, true)?;

    let action = match resource.kind() {
        ResourceKind::Workspace => AuditAction::WorkspaceMoveToTrash,
        _ => AuditAction::DocumentMoveToTrash,
    };
    let event = audit(scope, action, path.org, summary(&*txn, resource)?);
    Ok(Outcome::changed((), event))
}

/// Take a workspace or document out of the trash; the caller needs owner access.
///
/// Only the named resource's own flag is cleared. A document restored while
/// its workspace is still in the trash stays hidden until the workspace is
/// restored too.
pub fn restore(
    txn: &mut TreeTransaction,
    scope: &Scope,
    resource: &ResourceId,
) -> AccessResult<Outcome<()>> {
    reject_organization(resource, "restored from the trash")?;
    let path = require_role(&*txn, scope, resource, Role::Owner)?;
    set_removed(txn, resource, false)?;

    let action = match resource.kind() {
        ResourceKind::Workspace => AuditAction::WorkspaceRestoreFromTrash,
        _ => AuditAction::DocumentRestoreFromTrash,
    };
    let event = audit(scope, action, path.org, summary(&*txn, resource)?);
    Ok(Outcome::changed((), event))
}

fn set_removed(txn: &mut TreeTransaction, resource: &ResourceId, removed: bool) -> AccessResult<()> {
    let now = Utc::now();
    let (removed_at, updated_at) = match resource {
        ResourceId::Workspace(id) => {
            let ws = txn.workspace_mut(*id)?;
            (&mut ws.removed_at, &mut ws.updated_at)
        }
        ResourceId::Document(id) => {
            let doc = txn.document_mut(*id)?;
            (&mut doc.removed_at, &mut doc.updated_at)
        }
        ResourceId::Organization(_) => {
            return Err(AccessError::InvalidInput(
                "organizations have no trash".to_string(),
            ))
        }
    };
    match (removed_at.is_some(), removed) {
        (true, true) => return Err(AccessError::AlreadyDeleted(resource.clone())),
        (false, false) => return Err(AccessError::NotDeleted(resource.clone())),
        _ => {}
    }
    *removed_at = removed.then_some(now);
    *updated_at = now;
    Ok(())
}

/// Delete a resource and everything beneath it; the caller needs owner access.
///
/// Workspaces and documents must be in the trash first, directly or through
/// their workspace, unless `force` is set. Organizations are deleted
/// directly.
pub fn permanently_delete(
    txn: &mut TreeTransaction,
    scope: &Scope,
    resource: &ResourceId,
    force: bool,
) -> AccessResult<Outcome<CascadeCounts>> {
    let path = require_role(&*txn, scope, resource, Role::Owner)?;
    if resource.kind() != ResourceKind::Organization
        && !force
        && !txn.is_effectively_removed(resource)?
    {
        return Err(AccessError::NotDeleted(resource.clone()));
    }

    let described = summary(&*txn, resource)?;
    let counts = match resource {
        ResourceId::Organization(key) => txn.delete_organization(key)?.1,
        ResourceId::Workspace(id) => txn.delete_workspace(*id)?.1,
        ResourceId::Document(id) => {
            txn.delete_document(*id)?;
            CascadeCounts {
                workspaces: 0,
                documents: 1,
            }
        }
    };

    tracing::debug!(
        resource = %resource,
        workspaces = counts.workspaces,
        documents = counts.documents,
        "Resource permanently deleted"
    );
    let event = audit(scope, AuditAction::delete(resource.kind()), path.org, described)
        .with_metadata("workspaces", counts.workspaces.into())
        .with_metadata("documents", counts.documents.into());
    Ok(Outcome::changed(counts, event))
}

/// Pin or unpin a document; the caller needs editor access.
pub fn set_pinned(
    txn: &mut TreeTransaction,
    scope: &Scope,
    document: DocId,
    pinned: bool,
) -> AccessResult<Outcome<()>> {
    let path = require_role(&*txn, scope, &document.into(), Role::Editor)?;
    if txn.is_effectively_removed(&document.into())? {
        return Err(AccessError::AlreadyDeleted(document.into()));
    }
    let doc = txn.document_mut(document)?;
    if doc.is_pinned == pinned {
        return Ok(Outcome::unchanged(()));
    }
    doc.is_pinned = pinned;
    doc.updated_at = Utc::now();

    let action = if pinned {
        AuditAction::DocumentPin
    } else {
        AuditAction::DocumentUnpin
    };
    let event = audit(scope, action, path.org, summary(&*txn, &document.into())?);
    Ok(Outcome::changed((), event))
}

/// Change a document's type tag; the caller needs editor access.
///
/// Accepts `normal` (or an empty string), `template` and `tutorial`.
pub fn set_doc_type(
    txn: &mut TreeTransaction,
    scope: &Scope,
    document: DocId,
    doc_type: &str,
) -> AccessResult<Outcome<DocType>> {
    let doc_type = DocType::parse(doc_type)
        .ok_or_else(|| AccessError::InvalidInput(format!("unknown document type: {}", doc_type)))?;
    let path = require_role(&*txn, scope, &document.into(), Role::Editor)?;
    if txn.is_effectively_removed(&document.into())? {
        return Err(AccessError::AlreadyDeleted(document.into()));
    }
    let doc = txn.document_mut(document)?;
    let previous = doc.doc_type;
    if previous == doc_type {
        return Ok(Outcome::unchanged(doc_type));
    }
    doc.doc_type = doc_type;
    doc.updated_at = Utc::now();

    let event = audit(
        scope,
        AuditAction::DocumentChangeType,
        path.org,
        summary(&*txn, &document.into())?,
    )
    .with_change(&previous, &doc_type);
    Ok(Outcome::changed(doc_type, event))
}

/// Apply a permission delta and describe it for the audit log.
pub fn change_access(
    txn: &mut TreeTransaction,
    scope: &Scope,
    resource: &ResourceId,
    delta: &PermissionDelta,
) -> AccessResult<Outcome<AccessChanges>> {
    let changes = apply_delta(txn, scope, resource, delta)?;
    if !changes.is_changed() {
        return Ok(Outcome::unchanged(changes));
    }
    let org = txn.path(resource)?.org;
    let event = audit(
        scope,
        AuditAction::change_access(resource.kind()),
        org,
        summary(&*txn, resource)?,
    )
    .with_change(&changes.previous, &changes.current);
    Ok(Outcome::changed(changes, event))
}
