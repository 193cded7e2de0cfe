//! Audit event types
//!
//! Every committed mutation of the resource tree is described by one audit
//! event: which action ran, who ran it, on what, and the state before and
//! after. Events are published after commit and are purely informational;
//! nothing in the authorization core reads them back.

use chrono::{DateTime, Utc};
use platform_org::{OrgId, ResourceKind, ResourceSummary};
use platform_rbac::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Audit event envelope.
///
/// All events are wrapped in this envelope which provides metadata
/// for routing, tracing, and processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Action name (e.g., "document.move", "workspace.move_to_trash")
    pub event_type: String,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Organization ("site") context
    pub org_id: Option<OrgId>,

    /// User who triggered the event
    pub actor: Option<UserId>,

    /// Resource the action applied to
    pub resource: Option<ResourceSummary>,

    /// State before the action, for rename / move / access changes
    pub previous: Option<serde_json::Value>,

    /// State after the action
    pub current: Option<serde_json::Value>,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// Event version for schema evolution
    pub version: u32,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create a new event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The action name
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            org_id: None,
            actor: None,
            resource: None,
            previous: None,
            current: None,
            correlation_id: None,
            version: 1,
            metadata: HashMap::new(),
        }
    }

    /// Set organization context.
    pub fn with_org(mut self, org_id: OrgId) -> Self {
        self.org_id = Some(org_id);
        self
    }

    /// Set the acting user.
    pub fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the resource descriptor.
    pub fn with_resource(mut self, resource: ResourceSummary) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Attach a previous/current pair.
    ///
    /// Values that fail to serialize are recorded as `null`; an audit
    /// payload must never fail the operation it describes.
    pub fn with_change<T: Serialize>(mut self, previous: &T, current: &T) -> Self {
        self.previous = Some(serde_json::to_value(previous).unwrap_or_default());
        self.current = Some(serde_json::to_value(current).unwrap_or_default());
        self
    }

    /// Set correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get the topic for this event.
    ///
    /// Topics are the action names themselves: `{subject}.{verb}`.
    pub fn topic(&self) -> String {
        self.event_type.clone()
    }

    /// Parse the `current` payload into a specific type.
    pub fn parse_current<T: for<'de> Deserialize<'de>>(&self) -> Option<T> {
        self.current
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Parse the `previous` payload into a specific type.
    pub fn parse_previous<T: for<'de> Deserialize<'de>>(&self) -> Option<T> {
        self.previous
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
    }
}

/// Audit actions emitted by the authorization core.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Organization created
    SiteCreate,
    /// Organization renamed
    SiteRename,
    /// Organization permanently deleted
    SiteDelete,
    /// Organization ACL changed
    SiteChangeAccess,
    /// Workspace created
    WorkspaceCreate,
    /// Workspace renamed
    WorkspaceRename,
    /// Workspace soft-deleted
    WorkspaceMoveToTrash,
    /// Workspace restored
    WorkspaceRestoreFromTrash,
    /// Workspace permanently deleted
    WorkspaceDelete,
    /// Workspace ACL changed
    WorkspaceChangeAccess,
    /// Document created
    DocumentCreate,
    /// Document renamed
    DocumentRename,
    /// Document moved to another workspace
    DocumentMove,
    /// Document soft-deleted
    DocumentMoveToTrash,
    /// Document restored
    DocumentRestoreFromTrash,
    /// Document permanently deleted
    DocumentDelete,
    /// Document ACL changed
    DocumentChangeAccess,
    /// Document pinned
    DocumentPin,
    /// Document unpinned
    DocumentUnpin,
    /// Document type tag changed
    DocumentChangeType,
}

impl AuditAction {
    /// Action name used as the event type and topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SiteCreate => "site.create",
            Self::SiteRename => "site.rename",
            Self::SiteDelete => "site.delete",
            Self::SiteChangeAccess => "site.change_access",
            Self::WorkspaceCreate => "workspace.create",
            Self::WorkspaceRename => "workspace.rename",
            Self::WorkspaceMoveToTrash => "workspace.move_to_trash",
            Self::WorkspaceRestoreFromTrash => "workspace.restore_from_trash",
            Self::WorkspaceDelete => "workspace.delete",
            Self::WorkspaceChangeAccess => "workspace.change_access",
            Self::DocumentCreate => "document.create",
            Self::DocumentRename => "document.rename",
            Self::DocumentMove => "document.move",
            Self::DocumentMoveToTrash => "document.move_to_trash",
            Self::DocumentRestoreFromTrash => "document.restore_from_trash",
            Self::DocumentDelete => "document.delete",
            Self::DocumentChangeAccess => "document.change_access",
            Self::DocumentPin => "document.pin",
            Self::DocumentUnpin => "document.unpin",
            Self::DocumentChangeType => "document.change_type",
        }
    }

    /// Level of the resource the action applies to.
    pub fn subject(&self) -> ResourceKind {
        match self {
            Self::SiteCreate | Self::SiteRename | Self::SiteDelete | Self::SiteChangeAccess => {
                ResourceKind::Organization
            }
            Self::WorkspaceCreate
            | Self::WorkspaceRename
            | Self::WorkspaceMoveToTrash
            | Self::WorkspaceRestoreFromTrash
            | Self::WorkspaceDelete
            | Self::WorkspaceChangeAccess => ResourceKind::Workspace,
            _ => ResourceKind::Document,
        }
    }

    /// Rename action for a resource level.
    pub fn rename(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Organization => Self::SiteRename,
            ResourceKind::Workspace => Self::WorkspaceRename,
            ResourceKind::Document => Self::DocumentRename,
        }
    }

    /// Access-change action for a resource level.
    pub fn change_access(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Organization => Self::SiteChangeAccess,
            ResourceKind::Workspace => Self::WorkspaceChangeAccess,
            ResourceKind::Document => Self::DocumentChangeAccess,
        }
    }

    /// Permanent-delete action for a resource level.
    pub fn delete(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Organization => Self::SiteDelete,
            ResourceKind::Workspace => Self::WorkspaceDelete,
            ResourceKind::Document => Self::DocumentDelete,
        }
    }

    /// Start an event for this action.
    pub fn to_event(&self) -> Event {
        Event::new(self.as_str())
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = AuditAction::WorkspaceMoveToTrash
            .to_event()
            .with_org(OrgId(3))
            .with_actor(UserId(42));

        assert_eq!(event.event_type, "workspace.move_to_trash");
        assert_eq!(event.topic(), "workspace.move_to_trash");
        assert_eq!(event.org_id, Some(OrgId(3)));
        assert_eq!(event.actor, Some(UserId(42)));
        assert_eq!(event.version, 1);
    }

    #[test]
    fn test_change_pair_round_trips() {
        let event = AuditAction::DocumentRename
            .to_event()
            .with_change(&"Old".to_string(), &"New".to_string());

        assert_eq!(event.parse_previous::<String>().as_deref(), Some("Old"));
        assert_eq!(event.parse_current::<String>().as_deref(), Some("New"));
    }

    #[test]
    fn test_action_subjects() {
        assert_eq!(AuditAction::SiteDelete.subject(), ResourceKind::Organization);
        assert_eq!(AuditAction::DocumentPin.subject(), ResourceKind::Document);
        assert_eq!(
            AuditAction::change_access(ResourceKind::Workspace),
            AuditAction::WorkspaceChangeAccess
        );
        assert_eq!(AuditAction::delete(ResourceKind::Document).as_str(), "document.delete");
    }
}
