//! Authorization scope of one call
//!
//! A [`Scope`] is built per operation and dropped with it. The only way to
//! elevate access is a [`SpecialPermit`] attached to a scope value, so any
//! elevation is visible in the arguments of the call that uses it.

use platform_org::ResourceId;
use platform_rbac::{Identity, Role, UserId};
use serde::{Deserialize, Serialize};

/// One-shot role override for a single named resource.
///
/// The permit replaces the caller's resolved role on exactly that resource.
/// It is not inherited by children and does not apply to ancestors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecialPermit {
    /// The only resource the permit applies to
    pub resource: ResourceId,
    /// Role substituted on that resource
    pub role: Role,
}

impl SpecialPermit {
    /// Permit to view one resource.
    pub fn viewer(resource: impl Into<ResourceId>) -> Self {
        Self {
            resource: resource.into(),
            role: Role::Viewer,
        }
    }
}

/// Resolved, immutable authorization context for one operation.
///
/// # Examples
///
/// ```
/// use platform_access::{Scope, SpecialPermit};
/// use platform_org::OrgId;
/// use platform_rbac::{Identity, UserId};
///
/// let scope = Scope::new(Identity::new(UserId(5)));
/// assert!(scope.special_permit().is_none());
///
/// let elevated = scope.with_special_permit(SpecialPermit::viewer(OrgId(1)));
/// assert!(elevated.special_permit().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    identity: Identity,
    special_permit: Option<SpecialPermit>,
}

impl Scope {
    /// Scope for an identity with no elevation.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            special_permit: None,
        }
    }

    /// Scope of an anonymous request.
    pub fn anonymous() -> Self {
        Self::new(Identity::anonymous())
    }

    /// The requesting identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Id of the requesting identity.
    pub fn user_id(&self) -> UserId {
        self.identity.id
    }

    /// The attached permit, if any.
    pub fn special_permit(&self) -> Option<&SpecialPermit> {
        self.special_permit.as_ref()
    }

    /// Copy of this scope carrying a permit.
    pub fn with_special_permit(&self, permit: SpecialPermit) -> Self {
        Self {
            identity: self.identity.clone(),
            special_permit: Some(permit),
        }
    }
}

impl From<Identity> for Scope {
    fn from(identity: Identity) -> Self {
        Self::new(identity)
    }
}
