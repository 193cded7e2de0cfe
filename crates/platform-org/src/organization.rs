//! Organization domain models
//!
//! This module provides the core Organization entity. Organizations are the
//! top-level tenants of the hierarchy: they own workspaces and carry the
//! access-control list every descendant inherits from.

use chrono::{DateTime, Utc};
use platform_rbac::{Acl, UserId};
use serde::{Deserialize, Serialize};

use crate::resource::{OrgId, ResourceKind, ResourceSummary};

/// An organization represents a tenant in the multi-tenant system.
///
/// # Architecture
///
/// ```text
/// Organization (Acl)
///   └─ Workspaces (Acl, removed_at)
///         └─ Documents (Acl, removed_at, pinned, type)
/// ```
///
/// # Examples
///
/// ```
/// use platform_org::Organization;
/// use platform_rbac::{Role, Principal, UserId};
///
/// let org = Organization::new("Acme Corp", Some("acme"), UserId(42));
/// assert_eq!(org.name, "Acme Corp");
/// assert_eq!(org.acl.role_of(&Principal::User(UserId(42))), Role::Owner);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    /// Unique identifier, assigned by the store on insert
    pub id: OrgId,

    /// Human-readable name
    pub name: String,

    /// Unique domain key, if the organization has one
    pub domain: Option<String>,

    /// Direct access-control entries
    pub acl: Acl,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a new organization owned by its creator.
    ///
    /// The id is a placeholder until the store assigns one. The domain is
    /// normalized to lowercase.
    ///
    /// # Arguments
    ///
    /// * `name` - The organization name
    /// * `domain` - Unique domain key
    /// * `creator` - The user who becomes the initial owner
    pub fn new(name: impl Into<String>, domain: Option<&str>, creator: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: OrgId(0),
            name: name.into(),
            domain: domain.map(|d| d.trim().to_lowercase()),
            acl: Acl::with_owner(creator),
            created_at: now,
            updated_at: now,
        }
    }

    /// Summary for audit payloads.
    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            kind: ResourceKind::Organization,
            id: self.id.to_string(),
            name: self.name.clone(),
        }
    }
}
