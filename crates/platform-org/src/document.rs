//! Document domain models

use chrono::{DateTime, Utc};
use platform_rbac::{Acl, UserId};
use serde::{Deserialize, Serialize};

use crate::resource::{DocId, ResourceKind, ResourceSummary, WorkspaceId};

/// Document type tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    /// Regular document
    #[default]
    Normal,
    /// Template offered for copying
    Template,
    /// Tutorial walkthrough
    Tutorial,
}

impl DocType {
    /// Parse from string representation.
    ///
    /// # Examples
    ///
    /// ```
    /// use platform_org::DocType;
    ///
    /// assert_eq!(DocType::parse("template"), Some(DocType::Template));
    /// assert_eq!(DocType::parse(""), Some(DocType::Normal));
    /// assert_eq!(DocType::parse("spreadsheet"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" | "normal" => Some(Self::Normal),
            "template" => Some(Self::Template),
            "tutorial" => Some(Self::Tutorial),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Template => "template",
            Self::Tutorial => "tutorial",
        }
    }
}

/// A document inside a workspace.
///
/// The parent link changes on move; the ACL never does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier
    pub id: DocId,

    /// Current parent workspace
    pub workspace_id: WorkspaceId,

    /// Human-readable name
    pub name: String,

    /// Direct access-control entries
    pub acl: Acl,

    /// Type tag
    pub doc_type: DocType,

    /// Whether the document is pinned in its workspace
    pub is_pinned: bool,

    /// When the document was moved to trash
    pub removed_at: Option<DateTime<Utc>>,

    /// User who created the document
    pub created_by: UserId,

    /// When the document was created
    pub created_at: DateTime<Utc>,

    /// When the document was last updated
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a new normal document with the creator as owner.
    pub fn new(workspace_id: WorkspaceId, name: impl Into<String>, created_by: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: DocId::generate(),
            workspace_id,
            name: name.into(),
            acl: Acl::with_owner(created_by),
            doc_type: DocType::Normal,
            is_pinned: false,
            removed_at: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the type tag.
    pub fn with_type(mut self, doc_type: DocType) -> Self {
        self.doc_type = doc_type;
        self
    }

    /// Check if the document's own trash flag is set.
    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }

    /// Summary for audit payloads.
    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            kind: ResourceKind::Document,
            id: self.id.to_string(),
            name: self.name.clone(),
        }
    }
}
