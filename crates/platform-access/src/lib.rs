//! # Platform Access
//!
//! Authorization core of the Relay document platform. Every request is
//! resolved to an effective role on the organization / workspace / document
//! it targets before any data operation proceeds.
//!
//! ## Overview
//!
//! The platform-access crate handles:
//! - **Scope resolution**: effective role from direct and inherited grants
//! - **Permission deltas**: validated, atomic ACL changes that never orphan a resource
//! - **Lifecycle**: create, rename, move, trash, restore and permanent deletion
//! - **Privileged view**: one-shot elevation for support and install-admin users
//! - **Service**: transactions, time budgets and audit publishing around all of the above
//!
//! ## Roles
//!
//! | Operation | Required role |
//! |-----------|---------------|
//! | read, list, access report | viewer |
//! | create child, rename, move, pin, change type | editor |
//! | permission delta, trash, restore, permanent delete | owner |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use platform_access::{AccessConfig, AccessService, PermissionDelta};
//! use platform_rbac::{Identity, Role, UserId};
//!
//! async fn example() {
//!     let service = AccessService::in_memory(AccessConfig::from_env()).unwrap();
//!     let owner = Identity::new(UserId(42));
//!
//!     let org = service.create_organization(&owner, "Acme", Some("acme")).await.unwrap();
//!     let ws = service.create_workspace(&owner, &org.into(), "Shared").await.unwrap();
//!
//!     let delta = PermissionDelta::new().set_user(UserId(7), Role::Editor);
//!     service.apply_delta(&owner, &org.into(), &delta).await.unwrap();
//!
//!     let role = service
//!         .resolve_role(&Identity::new(UserId(7)), &ws.into())
//!         .await
//!         .unwrap();
//!     assert_eq!(role, Role::Editor);
//! }
//! ```
//!
//! ## Cross-Crate Integration
//!
//! - `platform-rbac`: roles, principals and ACLs
//! - `platform-org`: the resource tree and its transactional store
//! - `platform-events`: audit events published after each committed change

pub mod config;
pub mod delta;
pub mod error;
pub mod lifecycle;
pub mod listing;
pub mod privileged;
pub mod resolver;
pub mod scope;
pub mod service;

// Re-export main types
pub use config::{AccessConfig, ConfigError, DEFAULT_SUPPORT_EMAIL};
pub use delta::{apply_delta, AccessChanges, PermissionDelta};
pub use error::{AccessError, AccessResult};
pub use lifecycle::{Moved, Outcome, Renamed};
pub use listing::Trash;
pub use privileged::with_privileged_retry;
pub use resolver::{
    access_report, effective_role, inherited_role, require_role, resolve_path, AccessReport,
    PrincipalAccess,
};
pub use scope::{Scope, SpecialPermit};
pub use service::AccessService;
