//! Access-control configuration.
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for local development.

use platform_rbac::{is_valid_email, normalize_email, Identity};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Email of the distinguished support identity unless overridden.
pub const DEFAULT_SUPPORT_EMAIL: &str = "support@relay.local";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Settings of the access-control service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessConfig {
    /// Time budget of one operation in milliseconds, lock wait included.
    pub operation_timeout_ms: u64,

    /// Email of the support identity.
    pub support_email: String,

    /// Emails of install administrators.
    #[serde(default)]
    pub install_admin_emails: Vec<String>,

    /// Whether denied org reads are retried for support and admin users.
    pub privileged_retry: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 30_000,
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            install_admin_emails: Vec::new(),
            privileged_retry: true,
        }
    }
}

impl AccessConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ACCESS_OPERATION_TIMEOUT_MS`: Operation timeout (default: 30000)
    /// - `ACCESS_SUPPORT_EMAIL`: Support identity email (default: support@relay.local)
    /// - `ACCESS_INSTALL_ADMIN_EMAILS`: Comma-separated install admin emails
    /// - `ACCESS_PRIVILEGED_RETRY`: Enable the privileged retry (default: true)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            operation_timeout_ms: std::env::var("ACCESS_OPERATION_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.operation_timeout_ms),
            support_email: std::env::var("ACCESS_SUPPORT_EMAIL")
                .map(|s| normalize_email(&s))
                .unwrap_or(default.support_email),
            install_admin_emails: std::env::var("ACCESS_INSTALL_ADMIN_EMAILS")
                .map(|s| parse_email_list(&s))
                .unwrap_or(default.install_admin_emails),
            privileged_retry: std::env::var("ACCESS_PRIVILEGED_RETRY")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.privileged_retry),
        }
    }

    /// Get the operation timeout as a Duration.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operation_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ACCESS_OPERATION_TIMEOUT_MS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if !is_valid_email(&self.support_email) {
            return Err(ConfigError::InvalidValue {
                key: "ACCESS_SUPPORT_EMAIL".to_string(),
                message: format!("not an email address: {}", self.support_email),
            });
        }
        if let Some(bad) = self.install_admin_emails.iter().find(|e| !is_valid_email(e)) {
            return Err(ConfigError::InvalidValue {
                key: "ACCESS_INSTALL_ADMIN_EMAILS".to_string(),
                message: format!("not an email address: {}", bad),
            });
        }
        Ok(())
    }

    /// Check if an identity is the distinguished support identity.
    pub fn is_support(&self, identity: &Identity) -> bool {
        !identity.is_anonymous() && (identity.is_support || identity.has_email(&self.support_email))
    }

    /// Check if an identity is an install administrator.
    pub fn is_install_admin(&self, identity: &Identity) -> bool {
        !identity.is_anonymous()
            && self
                .install_admin_emails
                .iter()
                .any(|email| identity.has_email(email))
    }

    /// Check if denials for this identity may be retried with a permit.
    pub fn is_privileged(&self, identity: &Identity) -> bool {
        self.privileged_retry && (self.is_support(identity) || self.is_install_admin(identity))
    }
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(normalize_email)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_rbac::UserId;

    #[test]
    fn test_default_config_is_valid() {
        let config = AccessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.operation_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AccessConfig {
            operation_timeout_ms: 0,
            ..AccessConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AccessConfig {
            install_admin_emails: vec!["not-an-email".to_string()],
            ..AccessConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "ACCESS_INSTALL_ADMIN_EMAILS"
        ));
    }

    #[test]
    fn test_parse_email_list() {
        assert_eq!(
            parse_email_list(" Admin@Example.com, ,ops@example.com"),
            vec!["admin@example.com".to_string(), "ops@example.com".to_string()]
        );
    }

    #[test]
    fn test_privileged_identities() {
        let config = AccessConfig {
            install_admin_emails: vec!["admin@example.com".to_string()],
            ..AccessConfig::default()
        };

        let support = Identity::new(UserId(5)).with_email(DEFAULT_SUPPORT_EMAIL);
        let flagged = Identity::new(UserId(6)).as_support();
        let admin = Identity::new(UserId(7)).with_email("admin@example.com");
        let regular = Identity::new(UserId(8)).with_email("someone@example.com");

        assert!(config.is_privileged(&support));
        assert!(config.is_privileged(&flagged));
        assert!(config.is_privileged(&admin));
        assert!(!config.is_privileged(&regular));
        assert!(!config.is_privileged(&Identity::anonymous().as_support()));

        let disabled = AccessConfig {
            privileged_retry: false,
            ..config
        };
        assert!(!disabled.is_privileged(&support));
    }
}
