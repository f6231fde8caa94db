//! Per-browser session state.

use std::fmt;
use std::str::FromStr;

use idp_core::{Binding, UserProfile};
use uuid::Uuid;

/// Opaque identifier of a browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// An SSO request waiting for the user to log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Binding the request arrived on.
    pub binding: Binding,
    /// Issuer of the request.
    pub issuer: String,
    /// Relay state sent with the request, empty when none.
    pub relay_state: String,
}

/// Everything the IdP remembers about one browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// The authenticated user, once credentials were accepted.
    pub identity: Option<UserProfile>,
    /// The SSO request to complete after login.
    pub pending: Option<PendingRequest>,
}

impl SessionState {
    /// Returns true when nothing is stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.identity.is_none() && self.pending.is_none()
    }

    /// Relay state of the pending request, if any.
    #[must_use]
    pub fn pending_relay_state(&self) -> Option<&str> {
        self.pending
            .as_ref()
            .map(|p| p.relay_state.as_str())
            .filter(|rs| !rs.is_empty())
    }
}
