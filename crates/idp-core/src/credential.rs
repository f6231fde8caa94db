//! Credential verifier contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::profile::UserProfile;

/// Errors returned by a [`CredentialVerifier`].
///
/// ## Security
///
/// `InvalidCredentials` is returned for unknown usernames and wrong passwords
/// alike. It carries no payload so callers cannot tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Username unknown or password wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The credential store could not be reached or rejected the service account.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

impl VerifyError {
    /// Creates an unavailability error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Verifies a username and password and returns the user's profile.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Checks the credentials.
    async fn verify(&self, username: &str, password: &str) -> Result<UserProfile, VerifyError>;
}
