//! Role lattice
//!
//! Roles are totally ordered: `None < Viewer < Editor < Owner`. Every
//! authorization decision in the platform reduces to comparing an effective
//! role against a threshold, and every inheritance step reduces to taking the
//! maximum of two roles.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Access level an identity holds on a resource.
///
/// The hierarchy is: None < Viewer < Editor < Owner
///
/// # Permission Model
///
/// - **None**: No access; the resource is invisible
/// - **Viewer**: Read-only access
/// - **Editor**: Can create children, rename, move and pin
/// - **Owner**: Full control including sharing and deletion
///
/// # Examples
///
/// ```
/// use platform_rbac::Role;
///
/// assert!(Role::Owner.is_at_least(Role::Editor));
/// assert!(!Role::Viewer.is_at_least(Role::Editor));
/// assert_eq!(Role::Viewer.max(Role::Editor), Role::Editor);
/// ```
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No access
    #[default]
    None = 0,

    /// Read-only access
    Viewer = 1,

    /// Can create and edit content
    Editor = 2,

    /// Full control
    Owner = 3,
}

impl Role {
    /// All roles in ascending order.
    pub const ALL: [Role; 4] = [Role::None, Role::Viewer, Role::Editor, Role::Owner];

    /// Compare two roles in lattice order.
    pub fn compare(a: Role, b: Role) -> Ordering {
        a.cmp(&b)
    }

    /// The greater of two roles.
    ///
    /// Shadows `Ord::max` so callers read `a.max(b)` as a lattice join.
    pub fn max(self, other: Role) -> Role {
        if other > self {
            other
        } else {
            self
        }
    }

    /// Check whether this role meets a threshold.
    ///
    /// # Examples
    ///
    /// ```
    /// use platform_rbac::Role;
    ///
    /// assert!(Role::Editor.is_at_least(Role::Editor));
    /// assert!(Role::Editor.is_at_least(Role::Viewer));
    /// assert!(!Role::None.is_at_least(Role::Viewer));
    /// ```
    pub fn is_at_least(self, threshold: Role) -> bool {
        self >= threshold
    }

    /// `true` for any role above `None`.
    pub fn grants_access(self) -> bool {
        self > Role::None
    }

    /// Parse role from string representation.
    ///
    /// Accepts the singular names as well as the plural group names used in
    /// sharing payloads (`"viewers"`, `"editors"`, `"owners"`).
    ///
    /// # Examples
    ///
    /// ```
    /// use platform_rbac::Role;
    ///
    /// assert_eq!(Role::parse("owner"), Some(Role::Owner));
    /// assert_eq!(Role::parse("EDITORS"), Some(Role::Editor));
    /// assert_eq!(Role::parse("admin"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "viewer" | "viewers" => Some(Self::Viewer),
            "editor" | "editors" => Some(Self::Editor),
            "owner" | "owners" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Get string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Owner => "owner",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Owner > Role::Editor);
        assert!(Role::Editor > Role::Viewer);
        assert!(Role::Viewer > Role::None);
        assert_eq!(Role::default(), Role::None);
    }

    #[test]
    fn test_compare_and_max() {
        assert_eq!(Role::compare(Role::Viewer, Role::Owner), Ordering::Less);
        assert_eq!(Role::compare(Role::Editor, Role::Editor), Ordering::Equal);
        assert_eq!(Role::None.max(Role::Viewer), Role::Viewer);
        assert_eq!(Role::Owner.max(Role::Viewer), Role::Owner);
    }

    #[test]
    fn test_max_is_commutative_and_idempotent() {
        for a in Role::ALL {
            assert_eq!(a.max(a), a);
            for b in Role::ALL {
                assert_eq!(a.max(b), b.max(a));
                assert!(a.max(b).is_at_least(a));
                assert!(a.max(b).is_at_least(b));
            }
        }
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("viewers"), Some(Role::Viewer));
        assert_eq!(Role::parse("Owner"), Some(Role::Owner));
        assert_eq!(Role::parse("members"), None);
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Editor).unwrap();
        assert_eq!(json, "\"editor\"");
    }
}
