//! Error types for access-control operations
//!
//! Every operation of this crate returns one of these typed values. None of
//! them is retried inside the crate except a permission denial seen by the
//! privileged retry, and none is ever written to a response directly: the
//! API layer maps them with [`AccessError::status_code`] and
//! [`AccessError::error_code`].

use platform_org::{DocId, OrgId, ResourceId, StoreError};
use platform_rbac::Role;
use thiserror::Error;

/// Access-control error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// Resource does not exist or was permanently deleted
    #[error("Not found: {0}")]
    NotFound(ResourceId),

    /// Resolved role is below the role the operation requires
    ///
    /// Carries both roles so the caller can decide whether to disguise the
    /// denial as `NotFound` when the resource's existence is sensitive.
    #[error("Forbidden: {resource} requires {required} access, caller has {actual}")]
    Forbidden {
        /// Resource the check ran against
        resource: ResourceId,
        /// Role the operation needs
        required: Role,
        /// Role the caller holds
        actual: Role,
    },

    /// Anonymous caller attempted an operation that needs a user
    #[error("Anonymous callers cannot perform this operation")]
    Unauthenticated,

    /// Malformed or disallowed principal in a permission delta
    #[error("Invalid principal {principal}: {reason}")]
    InvalidPrincipal {
        /// Principal as rendered in the delta
        principal: String,
        /// Why it was rejected
        reason: String,
    },

    /// Delta would leave the resource without any owner
    #[error("Cannot remove the last owner of {0}")]
    LastOwnerRemoval(ResourceId),

    /// Documents cannot leave their organization
    #[error("Cannot move document {document} from organization {from} to organization {to}")]
    CrossOrganizationMove {
        /// Document being moved
        document: DocId,
        /// Organization it lives in
        from: OrgId,
        /// Organization of the destination workspace
        to: OrgId,
    },

    /// Resource is already in the trash
    #[error("Already deleted: {0}")]
    AlreadyDeleted(ResourceId),

    /// Resource is not in the trash
    #[error("Not deleted: {0}")]
    NotDeleted(ResourceId),

    /// Conflicting state detected at commit
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation exceeded its time budget and was rolled back
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    /// Request carried an unusable value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for access-control operations.
pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Build a `Forbidden` error.
    pub fn forbidden(resource: impl Into<ResourceId>, required: Role, actual: Role) -> Self {
        AccessError::Forbidden {
            resource: resource.into(),
            required,
            actual,
        }
    }

    /// Build an `InvalidPrincipal` error.
    pub fn invalid_principal(principal: impl ToString, reason: impl Into<String>) -> Self {
        AccessError::InvalidPrincipal {
            principal: principal.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if this error is a permission denial.
    ///
    /// Only denials are eligible for the privileged retry.
    pub fn is_permission_denial(&self) -> bool {
        matches!(self, AccessError::Forbidden { .. })
    }

    /// Check if this error should be logged at error level.
    ///
    /// Denials and validation failures are expected outcomes of user
    /// requests and should not be logged as errors.
    pub fn is_server_error(&self) -> bool {
        matches!(self, AccessError::Internal(_) | AccessError::Timeout(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::NotFound(_) => 404,
            AccessError::Unauthenticated => 401,
            AccessError::Forbidden { .. } => 403,

            AccessError::InvalidPrincipal { .. }
            | AccessError::LastOwnerRemoval(_)
            | AccessError::CrossOrganizationMove { .. }
            | AccessError::InvalidInput(_) => 400,

            AccessError::AlreadyDeleted(_)
            | AccessError::NotDeleted(_)
            | AccessError::Conflict(_) => 409,

            AccessError::Timeout(_) => 504,
            AccessError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::NotFound(_) => "NOT_FOUND",
            AccessError::Forbidden { .. } => "FORBIDDEN",
            AccessError::Unauthenticated => "UNAUTHENTICATED",
            AccessError::InvalidPrincipal { .. } => "INVALID_PRINCIPAL",
            AccessError::LastOwnerRemoval(_) => "LAST_OWNER_REMOVAL",
            AccessError::CrossOrganizationMove { .. } => "CROSS_ORGANIZATION_MOVE",
            AccessError::AlreadyDeleted(_) => "ALREADY_DELETED",
            AccessError::NotDeleted(_) => "NOT_DELETED",
            AccessError::Conflict(_) => "CONFLICT",
            AccessError::Timeout(_) => "TIMEOUT",
            AccessError::InvalidInput(_) => "INVALID_INPUT",
            AccessError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DomainTaken(domain) => {
                AccessError::Conflict(format!("domain {} is already in use", domain))
            }
            other => match other.resource() {
                Some(resource) => AccessError::NotFound(resource),
                None => AccessError::Internal(other.to_string()),
            },
        }
    }
}
