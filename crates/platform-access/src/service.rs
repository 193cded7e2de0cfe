//! Access service
//!
//! [`AccessService`] binds the resolver, the delta applier and the lifecycle
//! rules to a store, a configuration and an event bus. Reads run against a
//! snapshot. Every mutation runs in its own transaction under the configured
//! time budget: if the budget runs out the transaction is dropped and nothing
//! is applied. Audit events are published after commit and a failing bus
//! never fails the operation.

use platform_events::{Event, EventBus, MemoryEventBus};
use platform_org::{
    CascadeCounts, DocId, DocType, Document, MemoryTreeStore, OrgId, OrgKey, Organization,
    ResourceId, TreeTransaction, Workspace, WorkspaceId,
};
use platform_rbac::{Identity, Role};
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

use crate::config::{AccessConfig, ConfigError};
use crate::delta::{AccessChanges, PermissionDelta};
use crate::error::{AccessError, AccessResult};
use crate::lifecycle::{self, Moved, Outcome, Renamed};
use crate::listing::{self, Trash};
use crate::privileged::with_privileged_retry;
use crate::resolver::{access_report, effective_role, AccessReport};
use crate::scope::Scope;

/// Entry point of the authorization core.
///
/// # Example
///
/// ```rust,no_run
/// use platform_access::{AccessConfig, AccessService, PermissionDelta};
/// use platform_org::DocType;
/// use platform_rbac::{Identity, Role, UserId};
///
/// async fn example() {
///     let service = AccessService::in_memory(AccessConfig::default()).unwrap();
///     let alice = Identity::new(UserId(42));
///
///     let org = service.create_organization(&alice, "Acme", Some("acme")).await.unwrap();
///     let ws = service.create_workspace(&alice, &org.into(), "Marketing").await.unwrap();
///     let doc = service
///         .create_document(&alice, ws, "Launch plan", DocType::Normal)
///         .await
///         .unwrap();
///
///     let delta = PermissionDelta::new().set_everyone(Role::Viewer);
///     service.apply_delta(&alice, &doc.into(), &delta).await.unwrap();
///
///     let role = service
///         .resolve_role(&Identity::anonymous(), &doc.into())
///         .await
///         .unwrap();
///     assert_eq!(role, Role::Viewer);
/// }
/// ```
#[derive(Clone)]
pub struct AccessService {
    store: MemoryTreeStore,
    config: AccessConfig,
    events: Arc<dyn EventBus>,
}

impl std::fmt::Debug for AccessService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessService")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AccessService {
    /// Create a service over a store and an event bus.
    ///
    /// Fails when the configuration does not validate.
    pub fn new(
        store: MemoryTreeStore,
        config: AccessConfig,
        events: Arc<dyn EventBus>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            events,
        })
    }

    /// Service with an empty store and an in-memory event bus.
    pub fn in_memory(config: AccessConfig) -> Result<Self, ConfigError> {
        Self::new(
            MemoryTreeStore::new(),
            config,
            Arc::new(MemoryEventBus::new()),
        )
    }

    /// The underlying store.
    pub fn store(&self) -> &MemoryTreeStore {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// The bus audit events are published to.
    pub fn events(&self) -> &Arc<dyn EventBus> {
        &self.events
    }

    /// Register an identity and its login profiles.
    pub async fn register_identity(&self, identity: Identity) {
        self.store.register_identity(identity).await;
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Effective role of an identity on a resource.
    #[instrument(skip_all, fields(user = %identity.id, resource = %resource))]
    pub async fn resolve_role(&self, identity: &Identity, resource: &ResourceId) -> AccessResult<Role> {
        let snapshot = self.store.snapshot().await;
        effective_role(&snapshot, &Scope::new(identity.clone()), resource)
    }

    /// Fetch an organization.
    ///
    /// Support users and install admins get a privileged view when denied.
    #[instrument(skip_all, fields(user = %identity.id, org = %org))]
    pub async fn get_organization(
        &self,
        identity: &Identity,
        org: &OrgKey,
    ) -> AccessResult<Organization> {
        let snapshot = self.store.snapshot().await;
        let scope = Scope::new(identity.clone());
        with_privileged_retry(&self.config, &scope, org.clone(), |scope| {
            let result = listing::get_organization(&snapshot, &scope, org);
            async move { result }
        })
        .await
    }

    /// Fetch a workspace.
    #[instrument(skip_all, fields(user = %identity.id, workspace = %id))]
    pub async fn get_workspace(&self, identity: &Identity, id: WorkspaceId) -> AccessResult<Workspace> {
        let snapshot = self.store.snapshot().await;
        listing::get_workspace(&snapshot, &Scope::new(identity.clone()), id)
    }

    /// Fetch a document.
    #[instrument(skip_all, fields(user = %identity.id, document = %id))]
    pub async fn get_document(&self, identity: &Identity, id: DocId) -> AccessResult<Document> {
        let snapshot = self.store.snapshot().await;
        listing::get_document(&snapshot, &Scope::new(identity.clone()), id)
    }

    /// Everyone with access to a resource.
    ///
    /// For organizations, support users and install admins get a
    /// privileged view when denied.
    #[instrument(skip_all, fields(user = %identity.id, resource = %resource))]
    pub async fn get_access(
        &self,
        identity: &Identity,
        resource: &ResourceId,
    ) -> AccessResult<AccessReport> {
        let snapshot = self.store.snapshot().await;
        let scope = Scope::new(identity.clone());
        match resource {
            ResourceId::Organization(_) => {
                with_privileged_retry(&self.config, &scope, resource.clone(), |scope| {
                    let result = access_report(&snapshot, &scope, resource);
                    async move { result }
                })
                .await
            }
            _ => access_report(&snapshot, &scope, resource),
        }
    }

    /// Organizations in which the caller can see anything.
    #[instrument(skip_all, fields(user = %identity.id))]
    pub async fn list_organizations(&self, identity: &Identity) -> AccessResult<Vec<Organization>> {
        let snapshot = self.store.snapshot().await;
        listing::list_organizations(&snapshot, &Scope::new(identity.clone()))
    }

    /// Visible workspaces of an organization.
    #[instrument(skip_all, fields(user = %identity.id, org = %org, include_removed = include_removed))]
    pub async fn list_workspaces(
        &self,
        identity: &Identity,
        org: &OrgKey,
        include_removed: bool,
    ) -> AccessResult<Vec<Workspace>> {
        let snapshot = self.store.snapshot().await;
        listing::list_workspaces(&snapshot, &Scope::new(identity.clone()), org, include_removed)
    }

    /// Visible documents of a workspace.
    #[instrument(
        skip_all,
        fields(user = %identity.id, workspace = %workspace, include_removed = include_removed)
    )]
    pub async fn list_documents(
        &self,
        identity: &Identity,
        workspace: WorkspaceId,
        include_removed: bool,
    ) -> AccessResult<Vec<Document>> {
        let snapshot = self.store.snapshot().await;
        listing::list_documents(
            &snapshot,
            &Scope::new(identity.clone()),
            workspace,
            include_removed,
        )
    }

    /// Trashed workspaces and documents the caller owns.
    #[instrument(skip_all, fields(user = %identity.id, org = %org))]
    pub async fn list_trash(&self, identity: &Identity, org: &OrgKey) -> AccessResult<Trash> {
        let snapshot = self.store.snapshot().await;
        listing::list_trash(&snapshot, &Scope::new(identity.clone()), org)
    }

    /// Run an arbitrary operation with the privileged-view retry.
    pub async fn with_privileged_retry<T, F, Fut>(
        &self,
        identity: &Identity,
        resource: impl Into<ResourceId>,
        op: F,
    ) -> AccessResult<T>
    where
        F: Fn(Scope) -> Fut,
        Fut: Future<Output = AccessResult<T>>,
    {
        with_privileged_retry(&self.config, &Scope::new(identity.clone()), resource, op).await
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Create an organization owned by the caller.
    #[instrument(skip_all, fields(user = %identity.id, domain = ?domain))]
    pub async fn create_organization(
        &self,
        identity: &Identity,
        name: &str,
        domain: Option<&str>,
    ) -> AccessResult<OrgId> {
        let scope = Scope::new(identity.clone());
        self.write("create_organization", |txn| {
            lifecycle::create_organization(txn, &scope, name, domain)
        })
        .await
    }

    /// Create a workspace under an organization.
    #[instrument(skip_all, fields(user = %identity.id, org = %org))]
    pub async fn create_workspace(
        &self,
        identity: &Identity,
        org: &OrgKey,
        name: &str,
    ) -> AccessResult<WorkspaceId> {
        let scope = Scope::new(identity.clone());
        self.write("create_workspace", |txn| {
            lifecycle::create_workspace(txn, &scope, org, name)
        })
        .await
    }

    /// Create a document in a workspace.
    #[instrument(skip_all, fields(user = %identity.id, workspace = %workspace))]
    pub async fn create_document(
        &self,
        identity: &Identity,
        workspace: WorkspaceId,
        name: &str,
        doc_type: DocType,
    ) -> AccessResult<DocId> {
        let scope = Scope::new(identity.clone());
        self.write("create_document", |txn| {
            lifecycle::create_document(txn, &scope, workspace, name, doc_type)
        })
        .await
    }

    /// Rename an organization, workspace or document.
    #[instrument(skip_all, fields(user = %identity.id, resource = %resource))]
    pub async fn rename(
        &self,
        identity: &Identity,
        resource: &ResourceId,
        name: &str,
    ) -> AccessResult<Renamed> {
        let scope = Scope::new(identity.clone());
        self.write("rename", |txn| lifecycle::rename(txn, &scope, resource, name))
            .await
    }

    /// Move a document to another workspace of its organization.
    #[instrument(
        skip_all,
        fields(user = %identity.id, document = %document, destination = %destination)
    )]
    pub async fn move_document(
        &self,
        identity: &Identity,
        document: DocId,
        destination: WorkspaceId,
    ) -> AccessResult<Moved> {
        let scope = Scope::new(identity.clone());
        self.write("move_document", |txn| {
            lifecycle::move_document(txn, &scope, document, destination)
        })
        .await
    }

    /// Move a workspace or document to the trash.
    #[instrument(skip_all, fields(user = %identity.id, resource = %resource))]
    pub async fn soft_delete(&self, identity: &Identity, resource: &ResourceId) -> AccessResult<()> {
        let scope = Scope::new(identity.clone());
        self.write("soft_delete", |txn| lifecycle::soft_delete(txn, &scope, resource))
            .await
    }

    /// Take a workspace or document out of the trash.
    #[instrument(skip_all, fields(user = %identity.id, resource = %resource))]
    pub async fn restore(&self, identity: &Identity, resource: &ResourceId) -> AccessResult<()> {
        let scope = Scope::new(identity.clone());
        self.write("restore", |txn| lifecycle::restore(txn, &scope, resource))
            .await
    }

    /// Permanently delete a resource and everything beneath it.
    #[instrument(skip_all, fields(user = %identity.id, resource = %resource, force = force))]
    pub async fn permanently_delete(
        &self,
        identity: &Identity,
        resource: &ResourceId,
        force: bool,
    ) -> AccessResult<CascadeCounts> {
        let scope = Scope::new(identity.clone());
        self.write("permanently_delete", |txn| {
            lifecycle::permanently_delete(txn, &scope, resource, force)
        })
        .await
    }

    /// Pin or unpin a document.
    #[instrument(skip_all, fields(user = %identity.id, document = %document, pinned = pinned))]
    pub async fn set_pinned(
        &self,
        identity: &Identity,
        document: DocId,
        pinned: bool,
    ) -> AccessResult<()> {
        let scope = Scope::new(identity.clone());
        self.write("set_pinned", |txn| {
            lifecycle::set_pinned(txn, &scope, document, pinned)
        })
        .await
    }

    /// Change a document's type tag.
    #[instrument(skip_all, fields(user = %identity.id, document = %document, doc_type = %doc_type))]
    pub async fn set_doc_type(
        &self,
        identity: &Identity,
        document: DocId,
        doc_type: &str,
    ) -> AccessResult<DocType> {
        let scope = Scope::new(identity.clone());
        self.write("set_doc_type", |txn| {
            lifecycle::set_doc_type(txn, &scope, document, doc_type)
        })
        .await
    }

    /// Apply a permission delta to a resource.
    #[instrument(
        skip_all,
        fields(user = %identity.id, resource = %resource, entries = delta.len())
    )]
    pub async fn apply_delta(
        &self,
        identity: &Identity,
        resource: &ResourceId,
        delta: &PermissionDelta,
    ) -> AccessResult<AccessChanges> {
        let scope = Scope::new(identity.clone());
        self.write("apply_delta", |txn| {
            lifecycle::change_access(txn, &scope, resource, delta)
        })
        .await
    }

    /// Run one mutation in its own transaction under the time budget.
    ///
    /// Commits only when the outcome changed something, then publishes the
    /// audit event.
    async fn write<T, F>(&self, operation: &'static str, mutate: F) -> AccessResult<T>
    where
        F: FnOnce(&mut TreeTransaction) -> AccessResult<Outcome<T>>,
    {
        let budget = self.config.operation_timeout();
        let run = async move {
            let mut txn = self.store.begin().await;
            let outcome = match mutate(&mut txn) {
                Ok(outcome) => outcome,
                Err(err) => {
                    txn.rollback();
                    return Err(err);
                }
            };
            if outcome.is_changed() {
                let generation = txn.commit().await;
                tracing::info!(operation, generation, "Mutation committed");
            } else {
                txn.rollback();
            }
            Ok(outcome)
        };

        let outcome = match tokio::time::timeout(budget, run).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.config.operation_timeout_ms,
                    "Operation timed out, transaction rolled back"
                );
                return Err(AccessError::Timeout(self.config.operation_timeout_ms));
            }
        };

        if let Some(event) = outcome.audit {
            self.publish(event).await;
        }
        Ok(outcome.value)
    }

    async fn publish(&self, event: Event) {
        let event_type = event.event_type.clone();
        if let Err(err) = self.events.publish(event).await {
            tracing::warn!(error = %err, event_type = %event_type, "Failed to publish audit event");
        }
    }
}
