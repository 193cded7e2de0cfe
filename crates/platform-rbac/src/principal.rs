//! Principals and identities
//!
//! A principal is whatever an access-control entry can name: a registered
//! user, an email address that has not been bound to a user yet, or the
//! `everyone` pseudo-principal used for public link sharing. An identity is
//! the authenticated (or anonymous) actor behind a request.

use serde::{Deserialize, Serialize};

/// Stable numeric identifier of a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Identifier shared by every anonymous request.
    pub const ANONYMOUS: UserId = UserId(0);

    /// Check if this is the anonymous user.
    pub fn is_anonymous(&self) -> bool {
        *self == Self::ANONYMOUS
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize an email address for comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check for an email address.
///
/// Exactly one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

/// The subject of an access-control entry.
///
/// Ordering is total so ACLs iterate deterministically.
///
/// # Examples
///
/// ```
/// use platform_rbac::{Principal, UserId};
///
/// let user = Principal::User(UserId(42));
/// let pending = Principal::email("Alice@Example.com");
/// assert_eq!(pending, Principal::Email("alice@example.com".to_string()));
/// assert!(Principal::Everyone.is_everyone());
/// assert!(!user.is_everyone());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Principal {
    /// A registered user
    User(UserId),

    /// An email address not yet bound to a user
    Email(String),

    /// Anyone holding the link, including anonymous visitors
    Everyone,
}

impl Principal {
    /// Build an email principal with a normalized address.
    pub fn email(address: &str) -> Self {
        Self::Email(normalize_email(address))
    }

    /// Check if this is the `everyone` pseudo-principal.
    pub fn is_everyone(&self) -> bool {
        matches!(self, Self::Everyone)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Email(email) => write!(f, "email:{}", email),
            Self::Everyone => f.write_str("everyone"),
        }
    }
}

/// The actor behind a request, as supplied by the identity service.
///
/// # Examples
///
/// ```
/// use platform_rbac::{Identity, UserId};
///
/// let user = Identity::new(UserId(7)).with_email("bob@example.com");
/// assert!(user.has_email("BOB@example.com"));
/// assert!(!user.is_anonymous());
/// assert!(Identity::anonymous().is_anonymous());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Stable user id
    pub id: UserId,

    /// Normalized emails of every linked login profile
    #[serde(default, deserialize_with = "deserialize_emails")]
    pub emails: Vec<String>,

    /// Whether this is the distinguished support identity
    #[serde(default)]
    pub is_support: bool,
}

impl Identity {
    /// Create an identity with no login profiles.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            emails: Vec::new(),
            is_support: false,
        }
    }

    /// The anonymous identity.
    pub fn anonymous() -> Self {
        Self::new(UserId::ANONYMOUS)
    }

    /// Link a login profile email.
    pub fn with_email(mut self, email: &str) -> Self {
        let email = normalize_email(email);
        if !self.emails.contains(&email) {
            self.emails.push(email);
        }
        self
    }

    /// Mark as the support identity.
    pub fn as_support(mut self) -> Self {
        self.is_support = true;
        self
    }

    /// Check if this is the anonymous identity.
    pub fn is_anonymous(&self) -> bool {
        self.id.is_anonymous()
    }

    /// Check if any login profile uses this email.
    pub fn has_email(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.emails.iter().any(|e| normalize_email(e) == email)
    }

    /// Check if an ACE principal names this identity.
    ///
    /// `Everyone` is deliberately excluded; its scope depends on the level
    /// of the resource and is handled by the resolver.
    pub fn matches(&self, principal: &Principal) -> bool {
        match principal {
            Principal::User(id) => !self.is_anonymous() && *id == self.id,
            Principal::Email(email) => self.has_email(email),
            Principal::Everyone => false,
        }
    }
}

fn deserialize_emails<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    let mut emails: Vec<String> = Vec::with_capacity(raw.len());
    for email in raw.iter().map(|e| normalize_email(e)) {
        if !emails.contains(&email) {
            emails.push(email);
        }
    }
    Ok(emails)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialized_identity_emails_are_normalized() {
        let identity: Identity =
            serde_json::from_str(r#"{"id":7,"emails":["Bob@X.com"," bob@x.com"]}"#).unwrap();
        assert_eq!(identity.emails, vec!["bob@x.com".to_string()]);
        assert!(identity.has_email("bob@x.com"));
        assert!(identity.matches(&Principal::email("bob@x.com")));

        let raw = Identity {
            id: UserId(7),
            emails: vec!["Bob@X.com".to_string()],
            is_support: false,
        };
        assert!(raw.has_email("bob@x.com"));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email(" alice@example.com "));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@localhost"));
        assert!(!is_valid_email("a@b@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("al ice@example.com"));
    }

    #[test]
    fn test_identity_matches() {
        let alice = Identity::new(UserId(5)).with_email("alice@example.com");
        assert!(alice.matches(&Principal::User(UserId(5))));
        assert!(alice.matches(&Principal::email("ALICE@example.com")));
        assert!(!alice.matches(&Principal::User(UserId(6))));
        assert!(!alice.matches(&Principal::Everyone));
    }

    #[test]
    fn test_anonymous_never_matches_user_principal() {
        let anon = Identity::anonymous();
        assert!(!anon.matches(&Principal::User(UserId::ANONYMOUS)));
    }

    #[test]
    fn test_principal_ordering_is_total() {
        let mut principals = vec![
            Principal::Everyone,
            Principal::email("b@example.com"),
            Principal::User(UserId(2)),
            Principal::User(UserId(1)),
        ];
        principals.sort();
        assert_eq!(principals[0], Principal::User(UserId(1)));
        assert_eq!(principals[3], Principal::Everyone);
    }

    #[test]
    fn test_principal_serde_shape() {
        let json = serde_json::to_value(Principal::User(UserId(42))).unwrap();
        assert_eq!(json["kind"], "user");
        assert_eq!(json["value"], 42);
    }
}
