//! Permission deltas
//!
//! A [`PermissionDelta`] is a batch of principal to role assignments for one
//! resource, where `Role::None` removes the entry. [`apply_delta`] validates
//! the whole batch against the working copy of a transaction and replaces
//! the resource's ACL in one step, so either every entry lands or none does.

use platform_org::{ResourceId, ResourceKind, TreeRead, TreeTransaction};
use platform_rbac::{is_valid_email, normalize_email, AccessControlEntry, Acl, Principal, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AccessError, AccessResult};
use crate::resolver::require_role;
use crate::scope::Scope;

/// A batch of ACL changes for one resource.
///
/// Later assignments to the same principal win.
///
/// # Examples
///
/// ```
/// use platform_access::PermissionDelta;
/// use platform_rbac::{Principal, Role, UserId};
///
/// let delta = PermissionDelta::new()
///     .set_user(UserId(7), Role::Editor)
///     .set_email("pat@example.com", Role::Viewer)
///     .remove(Principal::User(UserId(9)));
/// assert_eq!(delta.len(), 3);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PermissionDelta {
    entries: Vec<AccessControlEntry>,
}

impl PermissionDelta {
    /// Create an empty delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a role to a principal.
    pub fn set(mut self, principal: Principal, role: Role) -> Self {
        self.entries.push(AccessControlEntry::new(principal, role));
        self
    }

    /// Assign a role to a registered user.
    pub fn set_user(self, user: platform_rbac::UserId, role: Role) -> Self {
        self.set(Principal::User(user), role)
    }

    /// Assign a role to an email address.
    ///
    /// The address is kept as written so a malformed one can be reported;
    /// it is normalized when the delta is applied.
    pub fn set_email(self, email: &str, role: Role) -> Self {
        self.set(Principal::Email(email.to_string()), role)
    }

    /// Set the public-link role.
    pub fn set_everyone(self, role: Role) -> Self {
        self.set(Principal::Everyone, role)
    }

    /// Remove a principal's entry.
    pub fn remove(self, principal: Principal) -> Self {
        self.set(principal, Role::None)
    }

    /// Entries in the order they were added.
    pub fn entries(&self) -> &[AccessControlEntry] {
        &self.entries
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

impl FromIterator<AccessControlEntry> for PermissionDelta {
    fn from_iter<T: IntoIterator<Item = AccessControlEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// ACL of a resource before and after a delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessChanges {
    /// The resource whose ACL changed
    pub resource: ResourceId,
    /// Direct ACL before the delta
    pub previous: Acl,
    /// Direct ACL after the delta
    pub current: Acl,
}

impl AccessChanges {
    /// Check if the delta changed anything.
    pub fn is_changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Validate and apply a delta inside a transaction.
///
/// The caller must own the resource. Email principals already bound to a
/// registered identity are stored as that user. On any error the working
/// copy is left untouched.
pub fn apply_delta(
    txn: &mut TreeTransaction,
    scope: &Scope,
    resource: &ResourceId,
    delta: &PermissionDelta,
) -> AccessResult<AccessChanges> {
    let path = require_role(&*txn, scope, resource, Role::Owner)?;
    let target = path.target().resource();
    if txn.is_effectively_removed(&target)? {
        return Err(AccessError::AlreadyDeleted(resource.clone()));
    }

    let assignments = normalize(&*txn, path.target_kind(), delta)?;
    let previous = txn.acl_at(path.target())?.clone();
    let mut current = previous.clone();
    for (principal, role) in &assignments {
        current.set(principal.clone(), *role);
    }

    if current == previous {
        return Ok(AccessChanges {
            resource: resource.clone(),
            previous,
            current,
        });
    }

    let demoted: Vec<&Principal> = assignments
        .iter()
        .filter(|(principal, role)| {
            **role != Role::Owner && previous.role_of(principal) == Role::Owner
        })
        .map(|(principal, _)| principal)
        .collect();

    if !demoted.is_empty() && current.owner_count() == 0 {
        // Ownership inherited from an ancestor only counts when it does not
        // come from a principal this very delta is demoting.
        let mut inherited_owner = false;
        for level in path.ancestors() {
            let acl = txn.acl_at(level)?;
            if acl.owners().any(|owner| !demoted.contains(&owner)) {
                inherited_owner = true;
                break;
            }
        }
        if !inherited_owner {
            tracing::debug!(resource = %resource, "Rejected delta removing the last owner");
            return Err(AccessError::LastOwnerRemoval(resource.clone()));
        }
    }

    txn.replace_acl(&target, current.clone())?;
    Ok(AccessChanges {
        resource: resource.clone(),
        previous,
        current,
    })
}

/// Validate every entry and collapse the delta to one role per principal.
fn normalize(
    tree: &TreeTransaction,
    kind: ResourceKind,
    delta: &PermissionDelta,
) -> AccessResult<BTreeMap<Principal, Role>> {
    let mut assignments = BTreeMap::new();
    for entry in delta.entries() {
        let principal = match &entry.principal {
            Principal::Everyone => {
                if kind != ResourceKind::Document {
                    return Err(AccessError::invalid_principal(
                        &entry.principal,
                        format!("public access cannot be granted on a {}", kind.as_str()),
                    ));
                }
                if !matches!(entry.role, Role::Viewer | Role::None) {
                    return Err(AccessError::invalid_principal(
                        &entry.principal,
                        "public access is limited to viewers",
                    ));
                }
                Principal::Everyone
            }
            Principal::Email(email) => {
                if !is_valid_email(email) {
                    return Err(AccessError::invalid_principal(
                        &entry.principal,
                        "not a valid email address",
                    ));
                }
                let email = normalize_email(email);
                match tree.find_user_by_email(&email) {
                    Some(user) => Principal::User(user),
                    None => Principal::Email(email),
                }
            }
            Principal::User(user) => {
                if user.is_anonymous() {
                    return Err(AccessError::invalid_principal(
                        &entry.principal,
                        "the anonymous user cannot hold a role",
                    ));
                }
                Principal::User(*user)
            }
        };
        assignments.insert(principal, entry.role);
    }
    Ok(assignments)
}
