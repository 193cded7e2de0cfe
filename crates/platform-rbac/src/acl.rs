//! # Access-control lists
//!
//! An ACL maps principals to roles on exactly one resource. Entries with
//! `Role::None` are never stored: assigning `None` removes the entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::principal::{Identity, Principal};
use crate::roles::Role;

/// A (principal, role) pair scoped to one resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AccessControlEntry {
    /// Who the entry applies to.
    pub principal: Principal,
    /// The role granted.
    pub role: Role,
}

impl AccessControlEntry {
    /// Create a new entry.
    pub fn new(principal: Principal, role: Role) -> Self {
        Self { principal, role }
    }
}

/// The set of entries attached to one resource.
///
/// Backed by an ordered map so iteration, serialization and equality are
/// independent of insertion order. Serialized as a list of entries since
/// principals are not plain string keys.
///
/// # Example
///
/// ```
/// use platform_rbac::{Acl, Principal, Role, UserId};
///
/// let mut acl = Acl::with_owner(UserId(42));
/// acl.set(Principal::User(UserId(7)), Role::Editor);
/// assert_eq!(acl.role_of(&Principal::User(UserId(7))), Role::Editor);
/// assert_eq!(acl.owner_count(), 1);
///
/// acl.set(Principal::User(UserId(7)), Role::None);
/// assert_eq!(acl.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Vec<AccessControlEntry>", into = "Vec<AccessControlEntry>")]
pub struct Acl {
    entries: BTreeMap<Principal, Role>,
}

impl Acl {
    /// Create an empty ACL.
    pub fn new() -> Self {
        Self::default()
    }

    /// ACL with a single owner entry for a user.
    pub fn with_owner(user: crate::principal::UserId) -> Self {
        let mut acl = Self::new();
        acl.set(Principal::User(user), Role::Owner);
        acl
    }

    /// Assign a role, returning the previous one.
    ///
    /// `Role::None` removes the entry.
    pub fn set(&mut self, principal: Principal, role: Role) -> Role {
        let previous = if role == Role::None {
            self.entries.remove(&principal)
        } else {
            self.entries.insert(principal, role)
        };
        previous.unwrap_or(Role::None)
    }

    /// Role held directly by a principal, `None` when absent.
    pub fn role_of(&self, principal: &Principal) -> Role {
        self.entries.get(principal).copied().unwrap_or(Role::None)
    }

    /// Highest role any entry matching the identity grants.
    ///
    /// Considers the user entry and every email profile. When
    /// `include_everyone` is set the `everyone` entry is folded in too.
    pub fn role_for(&self, identity: &Identity, include_everyone: bool) -> Role {
        self.entries
            .iter()
            .filter(|(principal, _)| {
                identity.matches(principal) || (include_everyone && principal.is_everyone())
            })
            .fold(Role::None, |acc, (_, role)| acc.max(*role))
    }

    /// Principals holding `Role::Owner`.
    pub fn owners(&self) -> impl Iterator<Item = &Principal> + '_ {
        self.entries
            .iter()
            .filter(|(_, role)| **role == Role::Owner)
            .map(|(principal, _)| principal)
    }

    /// Number of owner entries.
    pub fn owner_count(&self) -> usize {
        self.owners().count()
    }

    /// Iterate entries in principal order.
    pub fn entries(&self) -> impl Iterator<Item = AccessControlEntry> + '_ {
        self.entries
            .iter()
            .map(|(principal, role)| AccessControlEntry::new(principal.clone(), *role))
    }

    /// Iterate principals in order.
    pub fn principals(&self) -> impl Iterator<Item = &Principal> + '_ {
        self.entries.keys()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<AccessControlEntry> for Acl {
    fn from_iter<T: IntoIterator<Item = AccessControlEntry>>(iter: T) -> Self {
        let mut acl = Acl::new();
        for entry in iter {
            acl.set(entry.principal, entry.role);
        }
        acl
    }
}

impl From<Vec<AccessControlEntry>> for Acl {
    fn from(entries: Vec<AccessControlEntry>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<Acl> for Vec<AccessControlEntry> {
    fn from(acl: Acl) -> Self {
        acl.entries().collect()
    }
}
