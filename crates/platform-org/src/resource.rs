//! Resource identifiers and paths
//!
//! Every node of the hierarchy is addressed by a typed id. Parent links are
//! held by id rather than by reference, so a path is just the chain of ids
//! from the organization root down to the target.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric organization identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct OrgId(pub i64);

/// Numeric workspace identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct WorkspaceId(pub i64);

/// Document identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct DocId(pub Uuid);

impl DocId {
    /// Generate a fresh document id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for OrgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How callers name an organization: by id or by its domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum OrgKey {
    /// Numeric id
    Id(OrgId),
    /// Unique domain key
    Domain(String),
}

impl From<OrgId> for OrgKey {
    fn from(id: OrgId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for OrgKey {
    fn from(domain: &str) -> Self {
        Self::Domain(domain.to_lowercase())
    }
}

impl std::fmt::Display for OrgKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Domain(domain) => f.write_str(domain),
        }
    }
}

/// Level of a node in the hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Top-level tenant
    Organization,
    /// Container of documents
    Workspace,
    /// Leaf
    Document,
}

impl ResourceKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Workspace => "workspace",
            Self::Document => "document",
        }
    }
}

/// A reference to any node of the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ResourceId {
    /// An organization, by id or domain
    Organization(OrgKey),
    /// A workspace
    Workspace(WorkspaceId),
    /// A document
    Document(DocId),
}

impl ResourceId {
    /// Level of the referenced node.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Organization(_) => ResourceKind::Organization,
            Self::Workspace(_) => ResourceKind::Workspace,
            Self::Document(_) => ResourceKind::Document,
        }
    }
}

impl From<OrgId> for ResourceId {
    fn from(id: OrgId) -> Self {
        Self::Organization(OrgKey::Id(id))
    }
}

impl From<OrgKey> for ResourceId {
    fn from(key: OrgKey) -> Self {
        Self::Organization(key)
    }
}

impl From<WorkspaceId> for ResourceId {
    fn from(id: WorkspaceId) -> Self {
        Self::Workspace(id)
    }
}

impl From<DocId> for ResourceId {
    fn from(id: DocId) -> Self {
        Self::Document(id)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Organization(key) => write!(f, "organization:{}", key),
            Self::Workspace(id) => write!(f, "workspace:{}", id),
            Self::Document(id) => write!(f, "document:{}", id),
        }
    }
}

/// The chain of ids from the organization root down to a target node.
///
/// # Examples
///
/// ```
/// use platform_org::{OrgId, ResourceKind, ResourcePath, WorkspaceId};
///
/// let path = ResourcePath::workspace(OrgId(1), WorkspaceId(10));
/// assert_eq!(path.target_kind(), ResourceKind::Workspace);
/// assert_eq!(path.levels().len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    /// Root organization
    pub org: OrgId,
    /// Workspace level, if the target is a workspace or document
    pub workspace: Option<WorkspaceId>,
    /// Document level, if the target is a document
    pub document: Option<DocId>,
}

/// One level of a [`ResourcePath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathLevel {
    /// Organization level
    Organization(OrgId),
    /// Workspace level
    Workspace(WorkspaceId),
    /// Document level
    Document(DocId),
}

impl PathLevel {
    /// Convert into a resource reference.
    pub fn resource(&self) -> ResourceId {
        match *self {
            Self::Organization(id) => id.into(),
            Self::Workspace(id) => id.into(),
            Self::Document(id) => id.into(),
        }
    }
}

impl ResourcePath {
    /// Path to an organization.
    pub fn organization(org: OrgId) -> Self {
        Self {
            org,
            workspace: None,
            document: None,
        }
    }

    /// Path to a workspace.
    pub fn workspace(org: OrgId, workspace: WorkspaceId) -> Self {
        Self {
            org,
            workspace: Some(workspace),
            document: None,
        }
    }

    /// Path to a document.
    pub fn document(org: OrgId, workspace: WorkspaceId, document: DocId) -> Self {
        Self {
            org,
            workspace: Some(workspace),
            document: Some(document),
        }
    }

    /// Level of the deepest node.
    pub fn target_kind(&self) -> ResourceKind {
        match (self.workspace, self.document) {
            (_, Some(_)) => ResourceKind::Document,
            (Some(_), None) => ResourceKind::Workspace,
            (None, None) => ResourceKind::Organization,
        }
    }

    /// The deepest node.
    pub fn target(&self) -> PathLevel {
        match (self.workspace, self.document) {
            (_, Some(doc)) => PathLevel::Document(doc),
            (Some(ws), None) => PathLevel::Workspace(ws),
            (None, None) => PathLevel::Organization(self.org),
        }
    }

    /// Levels ordered from the root down to the target.
    pub fn levels(&self) -> Vec<PathLevel> {
        let mut levels = vec![PathLevel::Organization(self.org)];
        if let Some(ws) = self.workspace {
            levels.push(PathLevel::Workspace(ws));
        }
        if let Some(doc) = self.document {
            levels.push(PathLevel::Document(doc));
        }
        levels
    }

    /// Levels strictly above the target, root first.
    pub fn ancestors(&self) -> Vec<PathLevel> {
        let mut levels = self.levels();
        levels.pop();
        levels
    }
}

/// Lightweight description of a node for audit payloads and listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceSummary {
    /// Level of the node
    pub kind: ResourceKind,
    /// Id rendered as a string
    pub id: String,
    /// Display name
    pub name: String,
}
