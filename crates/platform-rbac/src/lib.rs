//! # Platform RBAC (Role-Based Access Control)
//!
//! This crate provides the value types every authorization decision on the
//! Relay platform is built from.
//!
//! ## Overview
//!
//! The platform-rbac crate handles:
//! - **Roles**: The totally ordered lattice `none < viewer < editor < owner`
//! - **Principals**: Users, pending email invitations, and the `everyone`
//!   pseudo-principal used for public links
//! - **Identities**: The actor behind a request and its login profiles
//! - **ACLs**: Per-resource maps from principal to role
//!
//! ## Architecture
//!
//! ```text
//! Resource ── Acl ──┬─ Principal::User(42)             → Owner
//!                   ├─ Principal::Email("a@b.com")     → Editor
//!                   └─ Principal::Everyone             → Viewer (documents only)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use platform_rbac::{Acl, Identity, Principal, Role, UserId};
//!
//! let mut acl = Acl::with_owner(UserId(42));
//! acl.set(Principal::email("bob@example.com"), Role::Editor);
//!
//! let bob = Identity::new(UserId(7)).with_email("bob@example.com");
//! assert_eq!(acl.role_for(&bob, false), Role::Editor);
//! assert!(acl.role_for(&bob, false).is_at_least(Role::Viewer));
//! ```
//!
//! ## Integration with platform-org
//!
//! Organizations, workspaces and documents each carry an [`Acl`]; the
//! resolver in `platform-access` folds them along the resource path.

pub mod acl;
pub mod principal;
pub mod roles;

// Re-export main types for convenience
pub use acl::{AccessControlEntry, Acl};
pub use principal::{is_valid_email, normalize_email, Identity, Principal, UserId};
pub use roles::Role;
