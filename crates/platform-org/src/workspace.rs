//! Workspace domain models
//!
//! Workspaces group documents within an organization. A workspace can be
//! soft-deleted ("moved to trash"); its documents are then hidden through the
//! ancestor check without their own flags being touched.

use chrono::{DateTime, Utc};
use platform_rbac::{Acl, UserId};
use serde::{Deserialize, Serialize};

use crate::resource::{OrgId, ResourceKind, ResourceSummary, WorkspaceId};

/// A workspace within an organization.
///
/// # Examples
///
/// ```
/// use platform_org::{OrgId, Workspace};
/// use platform_rbac::UserId;
///
/// let ws = Workspace::new(OrgId(1), "Marketing", UserId(42));
/// assert_eq!(ws.name, "Marketing");
/// assert!(!ws.is_removed());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    /// Unique identifier, assigned by the store on insert
    pub id: WorkspaceId,

    /// Organization this workspace belongs to
    pub org_id: OrgId,

    /// Human-readable name
    pub name: String,

    /// Direct access-control entries
    pub acl: Acl,

    /// When the workspace was moved to trash
    pub removed_at: Option<DateTime<Utc>>,

    /// User who created the workspace
    pub created_by: UserId,

    /// When the workspace was created
    pub created_at: DateTime<Utc>,

    /// When the workspace was last updated
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    /// Creates a new workspace with the creator as owner.
    ///
    /// # Arguments
    ///
    /// * `org_id` - The parent organization
    /// * `name` - Workspace name
    /// * `created_by` - User who becomes the initial owner
    pub fn new(org_id: OrgId, name: impl Into<String>, created_by: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: WorkspaceId(0),
            org_id,
            name: name.into(),
            acl: Acl::with_owner(created_by),
            removed_at: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the workspace is in the trash.
    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }

    /// Summary for audit payloads.
    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            kind: ResourceKind::Workspace,
            id: self.id.to_string(),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_creation() {
        let ws = Workspace::new(OrgId(3), "Docs", UserId(9));
        assert_eq!(ws.org_id, OrgId(3));
        assert_eq!(ws.created_by, UserId(9));
        assert_eq!(ws.acl.owner_count(), 1);
        assert!(ws.removed_at.is_none());
    }
}
