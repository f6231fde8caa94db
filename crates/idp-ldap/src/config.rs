//! LDAP connection settings.
//!
//! Settings come from the environment:
//!
//! | Variable                  | Default     |
//! |---------------------------|-------------|
//! | `LDAP_URL`                | required    |
//! | `LDAP_BIND_DN`            | required    |
//! | `LDAP_BIND_PASSWORD`      | required    |
//! | `LDAP_BASE_DN`            | required    |
//! | `LDAP_USERNAME_ATTRIBUTE` | `uid`       |
//! | `LDAP_GROUP_ATTRIBUTE`    | `memberOf`  |
//! | `LDAP_TIMEOUT_SECS`       | `5`         |
//!
//! ## Security
//!
//! `ldaps://` is recommended. Plain `ldap://` is accepted for lab setups but
//! sends the service account and user passwords in cleartext; a warning is
//! logged when it is used.

use std::fmt;
use std::time::Duration;

use crate::error::{LdapError, LdapResult};

/// LDAP settings for credential verification.
#[derive(Clone)]
pub struct LdapSettings {
    /// Server URL (`ldap://` or `ldaps://`).
    pub url: String,
    /// Service account DN used for user lookup.
    pub bind_dn: String,
    /// Service account password.
    pub bind_password: String,
    /// Base DN of the subtree search.
    pub base_dn: String,
    /// Attribute holding the login name.
    pub username_attribute: String,
    /// Attribute holding group memberships.
    pub group_attribute: String,
    /// Connect timeout.
    pub connection_timeout: Duration,
}

impl fmt::Debug for LdapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapSettings")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"[REDACTED]")
            .field("base_dn", &self.base_dn)
            .field("username_attribute", &self.username_attribute)
            .field("group_attribute", &self.group_attribute)
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

impl LdapSettings {
    /// Default username attribute.
    pub const DEFAULT_USERNAME_ATTRIBUTE: &'static str = "uid";

    /// Default group membership attribute.
    pub const DEFAULT_GROUP_ATTRIBUTE: &'static str = "memberOf";

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> LdapSettingsBuilder {
        LdapSettingsBuilder::new()
    }

    /// Loads settings from environment variables.
    pub fn from_env() -> LdapResult<Self> {
        let required = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| LdapError::config(format!("{name} environment variable is required")))
        };

        let mut builder = Self::builder()
            .url(required("LDAP_URL")?)
            .bind_dn(required("LDAP_BIND_DN")?)
            .bind_password(required("LDAP_BIND_PASSWORD")?)
            .base_dn(required("LDAP_BASE_DN")?);

        if let Ok(attr) = std::env::var("LDAP_USERNAME_ATTRIBUTE") {
            builder = builder.username_attribute(attr);
        }
        if let Ok(attr) = std::env::var("LDAP_GROUP_ATTRIBUTE") {
            builder = builder.group_attribute(attr);
        }
        if let Some(secs) = std::env::var("LDAP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            builder = builder.connection_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Validates the settings.
    pub fn validate(&self) -> LdapResult<()> {
        let url = self.url.to_lowercase();
        if !url.starts_with("ldaps://") && !url.starts_with("ldap://") {
            return Err(LdapError::config(
                "url must start with 'ldaps://' or 'ldap://'",
            ));
        }
        if self.bind_dn.is_empty() {
            return Err(LdapError::config("bind_dn cannot be empty"));
        }
        if self.base_dn.is_empty() {
            return Err(LdapError::config("base_dn cannot be empty"));
        }
        if self.username_attribute.is_empty() {
            return Err(LdapError::config("username_attribute cannot be empty"));
        }
        Ok(())
    }

    /// Returns true if the connection is not encrypted from the start.
    #[must_use]
    pub fn is_cleartext(&self) -> bool {
        !self.url.to_lowercase().starts_with("ldaps://")
    }

    /// Search filter matching `username` on the username attribute.
    #[must_use]
    pub fn user_filter(&self, username: &str) -> String {
        format!("({}={})", self.username_attribute, ldap_escape(username))
    }

    /// Attributes requested for the user entry.
    #[must_use]
    pub fn user_attributes(&self) -> Vec<&str> {
        vec![
            "cn",
            "mail",
            self.group_attribute.as_str(),
            self.username_attribute.as_str(),
            "displayName",
            "givenName",
            "sn",
        ]
    }
}

/// Escapes special characters in LDAP filter values (RFC 4515).
fn ldap_escape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\5c"),
            '*' => result.push_str("\\2a"),
            '(' => result.push_str("\\28"),
            ')' => result.push_str("\\29"),
            '\0' => result.push_str("\\00"),
            _ => result.push(c),
        }
    }
    result
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`LdapSettings`].
#[derive(Debug, Default)]
pub struct LdapSettingsBuilder {
    url: Option<String>,
    bind_dn: Option<String>,
    bind_password: Option<String>,
    base_dn: Option<String>,
    username_attribute: Option<String>,
    group_attribute: Option<String>,
    connection_timeout: Option<Duration>,
}

impl LdapSettingsBuilder {
    /// Creates a builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the service account DN.
    #[must_use]
    pub fn bind_dn(mut self, dn: impl Into<String>) -> Self {
        self.bind_dn = Some(dn.into());
        self
    }

    /// Sets the service account password.
    #[must_use]
    pub fn bind_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Sets the search base DN.
    #[must_use]
    pub fn base_dn(mut self, dn: impl Into<String>) -> Self {
        self.base_dn = Some(dn.into());
        self
    }

    /// Sets the username attribute.
    #[must_use]
    pub fn username_attribute(mut self, attr: impl Into<String>) -> Self {
        self.username_attribute = Some(attr.into());
        self
    }

    /// Sets the group membership attribute.
    #[must_use]
    pub fn group_attribute(mut self, attr: impl Into<String>) -> Self {
        self.group_attribute = Some(attr.into());
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    /// Builds and validates the settings.
    pub fn build(self) -> LdapResult<LdapSettings> {
        let settings = LdapSettings {
            url: self.url.ok_or_else(|| LdapError::config("url is required"))?,
            bind_dn: self
                .bind_dn
                .ok_or_else(|| LdapError::config("bind_dn is required"))?,
            bind_password: self
                .bind_password
                .ok_or_else(|| LdapError::config("bind_password is required"))?,
            base_dn: self
                .base_dn
                .ok_or_else(|| LdapError::config("base_dn is required"))?,
            username_attribute: self
                .username_attribute
                .unwrap_or_else(|| LdapSettings::DEFAULT_USERNAME_ATTRIBUTE.to_string()),
            group_attribute: self
                .group_attribute
                .unwrap_or_else(|| LdapSettings::DEFAULT_GROUP_ATTRIBUTE.to_string()),
            connection_timeout: self.connection_timeout.unwrap_or(Duration::from_secs(5)),
        };
        settings.validate()?;
        Ok(settings)
    }
}
