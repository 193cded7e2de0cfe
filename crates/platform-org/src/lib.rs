//! # Platform Organization Management
//!
//! This crate provides the multi-tenant resource hierarchy of the Relay
//! platform and the store that persists it.
//!
//! ## Overview
//!
//! The platform-org crate handles:
//! - **Organizations**: Top-level tenant entities
//! - **Workspaces**: Containers of documents within an organization
//! - **Documents**: Leaves, movable between workspaces of one organization
//! - **Resource paths**: Typed ids and root-to-target chains
//! - **Tree store**: Snapshots for reads, serialized transactions for writes
//!
//! ## Architecture
//!
//! ```text
//! Organization (Acl)
//!   └─ Workspace (Acl, removed_at)
//!        └─ Document (Acl, removed_at, pinned, type)
//!
//! MemoryTreeStore
//!   ├─ snapshot() → TreeSnapshot     (TreeRead)
//!   └─ begin()    → TreeTransaction  (TreeRead + writes, commit / rollback)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use platform_org::{Document, MemoryTreeStore, Organization, Workspace};
//! use platform_rbac::UserId;
//!
//! async fn example() {
//!     let store = MemoryTreeStore::new();
//!     let owner = UserId(42);
//!
//!     let mut txn = store.begin().await;
//!     let org = txn.insert_organization(Organization::new("Acme", Some("acme"), owner)).unwrap();
//!     let ws = txn.insert_workspace(Workspace::new(org, "Marketing", owner)).unwrap();
//!     txn.insert_document(Document::new(ws, "Launch plan", owner)).unwrap();
//!     txn.commit().await;
//! }
//! ```
//!
//! ## Cross-Crate Integration
//!
//! - `platform-rbac`: ACLs, principals and roles carried by every entity
//! - `platform-access`: Resolution and lifecycle rules over this store
//! - `platform-events`: Audit events describing these entities

pub mod document;
pub mod organization;
pub mod resource;
pub mod store;
pub mod workspace;

// Re-export main types for convenience
pub use document::{DocType, Document};
pub use organization::Organization;
pub use resource::{
    DocId, OrgId, OrgKey, PathLevel, ResourceId, ResourceKind, ResourcePath, ResourceSummary,
    WorkspaceId,
};
pub use store::{
    CascadeCounts, Child, MemoryTreeStore, ParentRef, StoreError, StoreResult, TreeRead,
    TreeSnapshot, TreeState, TreeTransaction,
};
pub use workspace::Workspace;
