//! Support code for the IdP end-to-end tests.
//!
//! [`StubDirectory`] stands in for LDAP so the full HTTP flow runs without an
//! external server.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use idp_core::{CredentialVerifier, UserProfile, VerifyError};

/// Directory of the PEM and YAML fixtures.
#[must_use]
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// In-memory directory keyed by username.
#[derive(Debug, Default, Clone)]
pub struct StubDirectory {
    users: HashMap<String, (String, UserProfile)>,
}

impl StubDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user.
    #[must_use]
    pub fn with_user(mut self, password: &str, profile: UserProfile) -> Self {
        self.users
            .insert(profile.username.clone(), (password.to_string(), profile));
        self
    }

    /// The directory used by most tests.
    ///
    /// - `jdoe` / `secret`: mail, display name, group `eng`
    /// - `alice` / `wonderland`: group `finance`, no mail
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_user(
                "secret",
                UserProfile::new("uid=jdoe,ou=people,dc=example,dc=com", "jdoe")
                    .with_email("jdoe@example.com")
                    .with_display_name("Jane Doe")
                    .with_groups(["eng"]),
            )
            .with_user(
                "wonderland",
                UserProfile::new("uid=alice,ou=people,dc=example,dc=com", "alice")
                    .with_given_name("Alice")
                    .with_groups(["finance"]),
            )
    }
}

#[async_trait]
impl CredentialVerifier for StubDirectory {
    async fn verify(&self, username: &str, password: &str) -> Result<UserProfile, VerifyError> {
        if username.is_empty() || password.is_empty() {
            return Err(VerifyError::InvalidCredentials);
        }
        match self.users.get(username) {
            Some((expected, profile)) if expected == password => Ok(profile.clone()),
            _ => Err(VerifyError::InvalidCredentials),
        }
    }
}
