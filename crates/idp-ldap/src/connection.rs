//! Single-use directory connections.
//!
//! Each verification opens its own connections and closes them when done.
//! Nothing is pooled, so a user bind never leaks into a later service lookup.
//!
//! [`DirectoryConnector`] and [`DirectorySession`] are the seam the verifier
//! talks to; [`Ldap3Connector`] is the production implementation.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};

use crate::config::LdapSettings;
use crate::error::{LdapError, LdapResult};
use crate::search::LdapEntry;

/// LDAP result code for a rejected simple bind.
const INVALID_CREDENTIALS: u32 = 49;

/// Opens connections to a directory.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Connects to the server named in `settings`.
    async fn open(&self, settings: &LdapSettings) -> LdapResult<Box<dyn DirectorySession>>;
}

/// One open directory connection.
#[async_trait]
pub trait DirectorySession: Send {
    /// Performs a simple bind.
    ///
    /// Returns `Ok(false)` when the server rejects the bind and `Err` only
    /// for transport failures.
    async fn bind(&mut self, dn: &str, password: &str) -> LdapResult<bool>;

    /// Finds the entry whose username attribute equals `username`.
    async fn search_user(
        &mut self,
        settings: &LdapSettings,
        username: &str,
    ) -> LdapResult<Option<LdapEntry>>;

    /// Unbinds and closes the connection. Errors are logged, not returned.
    async fn close(&mut self);
}

/// Connects with `ldap3`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldap3Connector;

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    async fn open(&self, settings: &LdapSettings) -> LdapResult<Box<dyn DirectorySession>> {
        let conn = DirectoryConnection::open(settings).await?;
        Ok(Box::new(conn))
    }
}

/// An open `ldap3` connection.
///
/// Dropping the handle without [`close`](DirectorySession::close) stops the
/// connection driver as well.
pub struct DirectoryConnection {
    ldap: Ldap,
}

impl DirectoryConnection {
    /// Connects to the server named in `settings`.
    pub async fn open(settings: &LdapSettings) -> LdapResult<Self> {
        let conn_settings = LdapConnSettings::new().set_conn_timeout(settings.connection_timeout);

        let (conn, ldap) = LdapConnAsync::with_settings(conn_settings, &settings.url)
            .await
            .map_err(|e| LdapError::connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!("LDAP connection driver error: {}", e);
            }
        });

        Ok(Self { ldap })
    }
}

#[async_trait]
impl DirectorySession for DirectoryConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> LdapResult<bool> {
        let result = self
            .ldap
            .simple_bind(dn, password)
            .await
            .map_err(|e| LdapError::connection(e.to_string()))?;

        if result.rc == 0 {
            return Ok(true);
        }
        if result.rc == INVALID_CREDENTIALS {
            tracing::debug!(dn = %dn, "LDAP bind rejected: invalid credentials");
        } else {
            tracing::debug!(dn = %dn, rc = result.rc, "LDAP bind rejected");
        }
        Ok(false)
    }

    /// The first match wins when the subtree holds more than one.
    async fn search_user(
        &mut self,
        settings: &LdapSettings,
        username: &str,
    ) -> LdapResult<Option<LdapEntry>> {
        let filter = settings.user_filter(username);

        let (entries, _) = self
            .ldap
            .search(
                &settings.base_dn,
                Scope::Subtree,
                &filter,
                settings.user_attributes(),
            )
            .await
            .map_err(|e| LdapError::Search(e.to_string()))?
            .success()
            .map_err(|e| LdapError::Search(e.to_string()))?;

        if entries.len() > 1 {
            tracing::debug!(
                matches = entries.len(),
                "Multiple LDAP entries matched username, using the first"
            );
        }

        Ok(entries
            .into_iter()
            .next()
            .map(|entry| LdapEntry::from_search_entry(SearchEntry::construct(entry))))
    }

    async fn close(&mut self) {
        if let Err(e) = self.ldap.unbind().await {
            tracing::debug!("LDAP unbind failed: {}", e);
        }
    }
}
