//! [`CredentialVerifier`] backed by an LDAP directory.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use idp_core::{CredentialVerifier, UserProfile, VerifyError};

use crate::config::LdapSettings;
use crate::connection::{DirectoryConnector, Ldap3Connector};
use crate::error::{LdapError, LdapResult};
use crate::search::LdapEntry;

/// Verifies credentials with a service-account lookup followed by a user bind.
///
/// ## Security
///
/// - the username is escaped before it enters the search filter
/// - an empty password is rejected before any bind, since many servers
///   treat it as an unauthenticated bind that succeeds
/// - a rejected service-account bind is an outage, not a credential failure
#[derive(Clone)]
pub struct LdapCredentialVerifier {
    settings: Arc<LdapSettings>,
    connector: Arc<dyn DirectoryConnector>,
}

impl LdapCredentialVerifier {
    /// Creates a verifier that connects with `ldap3`.
    #[must_use]
    pub fn new(settings: LdapSettings) -> Self {
        Self::with_connector(settings, Arc::new(Ldap3Connector))
    }

    /// Creates a verifier over a custom connector.
    #[must_use]
    pub fn with_connector(settings: LdapSettings, connector: Arc<dyn DirectoryConnector>) -> Self {
        if settings.is_cleartext() {
            tracing::warn!(
                url = %settings.url,
                "LDAP URL is not ldaps://; passwords will cross the network in cleartext"
            );
        }
        Self {
            settings: Arc::new(settings),
            connector,
        }
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &LdapSettings {
        &self.settings
    }

    /// Looks the user up on a service-account connection.
    async fn find_user(&self, username: &str) -> LdapResult<Option<LdapEntry>> {
        let mut conn = self.connector.open(&self.settings).await?;

        let result = async {
            if !conn
                .bind(&self.settings.bind_dn, &self.settings.bind_password)
                .await?
            {
                return Err(LdapError::Bind(
                    "service account credentials rejected".to_string(),
                ));
            }
            conn.search_user(&self.settings, username).await
        }
        .await;

        conn.close().await;
        result
    }

    /// Binds as `dn` on a fresh connection.
    async fn bind_as_user(&self, dn: &str, password: &str) -> LdapResult<bool> {
        let mut conn = self.connector.open(&self.settings).await?;
        let result = conn.bind(dn, password).await;
        conn.close().await;
        result
    }
}

impl fmt::Debug for LdapCredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapCredentialVerifier")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialVerifier for LdapCredentialVerifier {
    async fn verify(&self, username: &str, password: &str) -> Result<UserProfile, VerifyError> {
        if username.is_empty() || password.is_empty() {
            return Err(VerifyError::InvalidCredentials);
        }

        let Some(entry) = self.find_user(username).await.map_err(|e| {
            tracing::error!(error = %e, "LDAP user lookup failed");
            VerifyError::from(e)
        })?
        else {
            tracing::debug!("LDAP user not found");
            return Err(VerifyError::InvalidCredentials);
        };

        let bound = self.bind_as_user(&entry.dn, password).await.map_err(|e| {
            tracing::error!(error = %e, "LDAP user bind failed");
            VerifyError::from(e)
        })?;
        if !bound {
            return Err(VerifyError::InvalidCredentials);
        }

        let profile = entry.into_profile(&self.settings, username);
        tracing::info!(username = %profile.username, "LDAP authentication succeeded");
        Ok(profile)
    }
}
