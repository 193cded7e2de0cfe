//! Resource tree store
//!
//! Persisted representation of organizations, workspaces and documents, their
//! parent links and their access-control lists.
//!
//! The store never decides transaction lifetime. Reads go through the
//! [`TreeRead`] trait, implemented both by an immutable [`TreeSnapshot`]
//! (best-effort reads, never blocks) and by a [`TreeTransaction`] (a private
//! working copy taken under the store's writer lock). Mutations exist only on
//! the transaction; `commit` publishes the copy atomically and dropping the
//! transaction without committing discards it.

use platform_rbac::{Acl, Identity, UserId};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::document::Document;
use crate::organization::Organization;
use crate::resource::{DocId, OrgId, OrgKey, PathLevel, ResourceId, ResourcePath, WorkspaceId};
use crate::workspace::Workspace;

/// Store error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No organization with this id or domain
    #[error("Organization not found: {0}")]
    OrganizationNotFound(OrgKey),

    /// No workspace with this id
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(WorkspaceId),

    /// No document with this id
    #[error("Document not found: {0}")]
    DocumentNotFound(DocId),

    /// Another organization already uses this domain
    #[error("Domain already in use: {0}")]
    DomainTaken(String),
}

impl StoreError {
    /// The resource a not-found error refers to.
    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            StoreError::OrganizationNotFound(key) => Some(ResourceId::Organization(key.clone())),
            StoreError::WorkspaceNotFound(id) => Some(ResourceId::Workspace(*id)),
            StoreError::DocumentNotFound(id) => Some(ResourceId::Document(*id)),
            StoreError::DomainTaken(_) => None,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Number of rows removed by a cascading delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeCounts {
    /// Workspaces removed
    pub workspaces: usize,
    /// Documents removed
    pub documents: usize,
}

/// Full contents of the tree at one point in time.
#[derive(Debug, Clone, Default)]
pub struct TreeState {
    organizations: BTreeMap<OrgId, Organization>,
    workspaces: BTreeMap<WorkspaceId, Workspace>,
    documents: BTreeMap<DocId, Document>,
    identities: BTreeMap<UserId, Identity>,
    last_org_id: i64,
    last_workspace_id: i64,
    generation: u64,
}

/// Parent whose children can be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    /// Workspaces of an organization
    Organization(OrgId),
    /// Documents of a workspace
    Workspace(WorkspaceId),
}

/// A child yielded by [`TreeRead::list_children`].
#[derive(Debug, Clone, Copy)]
pub enum Child<'a> {
    /// A workspace
    Workspace(&'a Workspace),
    /// A document
    Document(&'a Document),
}

/// Read access to the tree.
///
/// Every method has a default implementation in terms of [`TreeRead::tree`],
/// so snapshots and transactions answer identically for identical state.
pub trait TreeRead {
    /// The state being read.
    fn tree(&self) -> &TreeState;

    /// Commit counter of the state being read.
    fn generation(&self) -> u64 {
        self.tree().generation
    }

    /// Look up an organization by id or domain.
    fn get_organization(&self, key: &OrgKey) -> StoreResult<&Organization> {
        let tree = self.tree();
        let found = match key {
            OrgKey::Id(id) => tree.organizations.get(id),
            OrgKey::Domain(domain) => {
                let domain = domain.to_lowercase();
                tree.organizations
                    .values()
                    .find(|org| org.domain.as_deref() == Some(domain.as_str()))
            }
        };
        found.ok_or_else(|| StoreError::OrganizationNotFound(key.clone()))
    }

    /// Look up a workspace.
    fn get_workspace(&self, id: WorkspaceId) -> StoreResult<&Workspace> {
        self.tree()
            .workspaces
            .get(&id)
            .ok_or(StoreError::WorkspaceNotFound(id))
    }

    /// Look up a document.
    fn get_document(&self, id: DocId) -> StoreResult<&Document> {
        self.tree()
            .documents
            .get(&id)
            .ok_or(StoreError::DocumentNotFound(id))
    }

    /// Chain of ids from the organization root down to `resource`.
    fn path(&self, resource: &ResourceId) -> StoreResult<ResourcePath> {
        match resource {
            ResourceId::Organization(key) => {
                Ok(ResourcePath::organization(self.get_organization(key)?.id))
            }
            ResourceId::Workspace(id) => {
                let ws = self.get_workspace(*id)?;
                Ok(ResourcePath::workspace(ws.org_id, ws.id))
            }
            ResourceId::Document(id) => {
                let doc = self.get_document(*id)?;
                let ws = self.get_workspace(doc.workspace_id)?;
                Ok(ResourcePath::document(ws.org_id, ws.id, doc.id))
            }
        }
    }

    /// Direct ACL of one path level.
    fn acl_at(&self, level: PathLevel) -> StoreResult<&Acl> {
        match level {
            PathLevel::Organization(id) => Ok(&self.get_organization(&OrgKey::Id(id))?.acl),
            PathLevel::Workspace(id) => Ok(&self.get_workspace(id)?.acl),
            PathLevel::Document(id) => Ok(&self.get_document(id)?.acl),
        }
    }

    /// Direct ACL of a resource.
    fn acl(&self, resource: &ResourceId) -> StoreResult<&Acl> {
        let path = self.path(resource)?;
        self.acl_at(path.target())
    }

    /// Whether a resource is hidden by its own trash flag or its workspace's.
    ///
    /// Organizations are never in the trash.
    fn is_effectively_removed(&self, resource: &ResourceId) -> StoreResult<bool> {
        match resource {
            ResourceId::Organization(key) => self.get_organization(key).map(|_| false),
            ResourceId::Workspace(id) => Ok(self.get_workspace(*id)?.is_removed()),
            ResourceId::Document(id) => {
                let doc = self.get_document(*id)?;
                Ok(doc.is_removed() || self.get_workspace(doc.workspace_id)?.is_removed())
            }
        }
    }

    /// Children of a parent, lazily.
    ///
    /// Soft-deleted entries are skipped unless `include_removed` is set; the
    /// documents of a workspace in the trash are skipped with it. Each call
    /// starts a fresh pass, and an unknown parent simply has no children.
    fn list_children(
        &self,
        parent: ParentRef,
        include_removed: bool,
    ) -> Box<dyn Iterator<Item = Child<'_>> + '_> {
        let tree = self.tree();
        match parent {
            ParentRef::Organization(org_id) => Box::new(
                tree.workspaces
                    .values()
                    .filter(move |ws| ws.org_id == org_id && (include_removed || !ws.is_removed()))
                    .map(Child::Workspace),
            ),
            ParentRef::Workspace(ws_id) => {
                let parent_hidden = tree
                    .workspaces
                    .get(&ws_id)
                    .map_or(true, |ws| ws.is_removed());
                if parent_hidden && !include_removed {
                    return Box::new(std::iter::empty());
                }
                Box::new(
                    tree.documents
                        .values()
                        .filter(move |doc| {
                            doc.workspace_id == ws_id && (include_removed || !doc.is_removed())
                        })
                        .map(Child::Document),
                )
            }
        }
    }

    /// All organizations, in id order.
    fn organizations(&self) -> Box<dyn Iterator<Item = &Organization> + '_> {
        Box::new(self.tree().organizations.values())
    }

    /// Registered identity by id.
    fn get_identity(&self, id: UserId) -> Option<&Identity> {
        self.tree().identities.get(&id)
    }

    /// User whose login profiles include this email.
    fn find_user_by_email(&self, email: &str) -> Option<UserId> {
        self.tree()
            .identities
            .values()
            .find(|identity| identity.has_email(email))
            .map(|identity| identity.id)
    }
}

/// Immutable view of the tree at one commit.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    state: Arc<TreeState>,
}

impl TreeRead for TreeSnapshot {
    fn tree(&self) -> &TreeState {
        &self.state
    }
}

/// A write transaction.
///
/// Holds the store's writer lock for its whole lifetime, so concurrent
/// writers are serialized and every check made through it sees a state no
/// other writer can change before `commit`.
pub struct TreeTransaction {
    working: TreeState,
    shared: Arc<RwLock<Arc<TreeState>>>,
    _writer: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for TreeTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeTransaction")
            .field("base_generation", &self.working.generation)
            .finish()
    }
}

impl TreeRead for TreeTransaction {
    fn tree(&self) -> &TreeState {
        &self.working
    }
}

impl TreeTransaction {
    /// Resolve an organization key to its id.
    pub fn resolve_org_id(&self, key: &OrgKey) -> StoreResult<OrgId> {
        Ok(self.get_organization(key)?.id)
    }

    /// Insert an organization, assigning its id.
    pub fn insert_organization(&mut self, mut org: Organization) -> StoreResult<OrgId> {
        if let Some(domain) = org.domain.as_deref() {
            let taken = self
                .working
                .organizations
                .values()
                .any(|existing| existing.domain.as_deref() == Some(domain));
            if taken {
                return Err(StoreError::DomainTaken(domain.to_string()));
            }
        }
        self.working.last_org_id += 1;
        org.id = OrgId(self.working.last_org_id);
        let id = org.id;
        self.working.organizations.insert(id, org);
        Ok(id)
    }

    /// Insert a workspace under an existing organization, assigning its id.
    pub fn insert_workspace(&mut self, mut ws: Workspace) -> StoreResult<WorkspaceId> {
        if !self.working.organizations.contains_key(&ws.org_id) {
            return Err(StoreError::OrganizationNotFound(OrgKey::Id(ws.org_id)));
        }
        self.working.last_workspace_id += 1;
        ws.id = WorkspaceId(self.working.last_workspace_id);
        let id = ws.id;
        self.working.workspaces.insert(id, ws);
        Ok(id)
    }

    /// Insert a document under an existing workspace.
    pub fn insert_document(&mut self, doc: Document) -> StoreResult<DocId> {
        if !self.working.workspaces.contains_key(&doc.workspace_id) {
            return Err(StoreError::WorkspaceNotFound(doc.workspace_id));
        }
        let id = doc.id;
        self.working.documents.insert(id, doc);
        Ok(id)
    }

    /// Mutable organization.
    pub fn organization_mut(&mut self, key: &OrgKey) -> StoreResult<&mut Organization> {
        let id = self.resolve_org_id(key)?;
        self.working
            .organizations
            .get_mut(&id)
            .ok_or_else(|| StoreError::OrganizationNotFound(key.clone()))
    }

    /// Mutable workspace.
    pub fn workspace_mut(&mut self, id: WorkspaceId) -> StoreResult<&mut Workspace> {
        self.working
            .workspaces
            .get_mut(&id)
            .ok_or(StoreError::WorkspaceNotFound(id))
    }

    /// Mutable document.
    pub fn document_mut(&mut self, id: DocId) -> StoreResult<&mut Document> {
        self.working
            .documents
            .get_mut(&id)
            .ok_or(StoreError::DocumentNotFound(id))
    }

    /// Replace the direct ACL of a resource, returning the previous one.
    pub fn replace_acl(&mut self, resource: &ResourceId, acl: Acl) -> StoreResult<Acl> {
        let now = chrono::Utc::now();
        let slot = match resource {
            ResourceId::Organization(key) => {
                let org = self.organization_mut(key)?;
                org.updated_at = now;
                &mut org.acl
            }
            ResourceId::Workspace(id) => {
                let ws = self.workspace_mut(*id)?;
                ws.updated_at = now;
                &mut ws.acl
            }
            ResourceId::Document(id) => {
                let doc = self.document_mut(*id)?;
                doc.updated_at = now;
                &mut doc.acl
            }
        };
        Ok(std::mem::replace(slot, acl))
    }

    /// Remove a document row and its ACL.
    pub fn delete_document(&mut self, id: DocId) -> StoreResult<Document> {
        self.working
            .documents
            .remove(&id)
            .ok_or(StoreError::DocumentNotFound(id))
    }

    /// Remove a workspace row and every document under it.
    pub fn delete_workspace(&mut self, id: WorkspaceId) -> StoreResult<(Workspace, CascadeCounts)> {
        let ws = self
            .working
            .workspaces
            .remove(&id)
            .ok_or(StoreError::WorkspaceNotFound(id))?;
        let before = self.working.documents.len();
        self.working.documents.retain(|_, doc| doc.workspace_id != id);
        let counts = CascadeCounts {
            workspaces: 1,
            documents: before - self.working.documents.len(),
        };
        Ok((ws, counts))
    }

    /// Remove an organization and everything beneath it.
    pub fn delete_organization(
        &mut self,
        key: &OrgKey,
    ) -> StoreResult<(Organization, CascadeCounts)> {
        let id = self.resolve_org_id(key)?;
        let ws_ids: Vec<WorkspaceId> = self
            .working
            .workspaces
            .values()
            .filter(|ws| ws.org_id == id)
            .map(|ws| ws.id)
            .collect();
        let mut counts = CascadeCounts::default();
        for ws_id in ws_ids {
            let (_, removed) = self.delete_workspace(ws_id)?;
            counts.workspaces += removed.workspaces;
            counts.documents += removed.documents;
        }
        let org = self
            .working
            .organizations
            .remove(&id)
            .ok_or_else(|| StoreError::OrganizationNotFound(key.clone()))?;
        Ok((org, counts))
    }

    /// Register or replace an identity and its login profiles.
    pub fn upsert_identity(&mut self, identity: Identity) {
        self.working.identities.insert(identity.id, identity);
    }

    /// Publish the working copy.
    ///
    /// Returns the new generation.
    pub async fn commit(self) -> u64 {
        let TreeTransaction {
            mut working,
            shared,
            _writer,
        } = self;
        working.generation += 1;
        let generation = working.generation;
        *shared.write().await = Arc::new(working);
        tracing::debug!(generation, "Tree transaction committed");
        generation
    }

    /// Discard the working copy.
    pub fn rollback(self) {
        tracing::debug!(
            base_generation = self.working.generation,
            "Tree transaction rolled back"
        );
    }
}

/// In-memory, copy-on-write tree store.
///
/// Readers clone an `Arc` and never wait on writers. Writers queue on a
/// single lock and work on a private copy of the state.
///
/// # Example
///
/// ```rust,no_run
/// use platform_org::{MemoryTreeStore, Organization, TreeRead};
/// use platform_rbac::UserId;
///
/// async fn example() {
///     let store = MemoryTreeStore::new();
///     let mut txn = store.begin().await;
///     let org_id = txn
///         .insert_organization(Organization::new("Acme", Some("acme"), UserId(1)))
///         .unwrap();
///     txn.commit().await;
///
///     let snapshot = store.snapshot().await;
///     assert_eq!(snapshot.get_organization(&org_id.into()).unwrap().name, "Acme");
/// }
/// ```
#[derive(Clone, Default)]
pub struct MemoryTreeStore {
    current: Arc<RwLock<Arc<TreeState>>>,
    writer: Arc<Mutex<()>>,
}

impl std::fmt::Debug for MemoryTreeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTreeStore").finish_non_exhaustive()
    }
}

impl MemoryTreeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Immutable view of the latest committed state.
    pub async fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            state: self.current.read().await.clone(),
        }
    }

    /// Start a write transaction, waiting for the writer lock.
    pub async fn begin(&self) -> TreeTransaction {
        let writer = self.writer.clone().lock_owned().await;
        let working = TreeState::clone(&*self.current.read().await);
        TreeTransaction {
            working,
            shared: self.current.clone(),
            _writer: writer,
        }
    }

    /// Register an identity in its own transaction.
    pub async fn register_identity(&self, identity: Identity) {
        let mut txn = self.begin().await;
        txn.upsert_identity(identity);
        txn.commit().await;
    }
}
