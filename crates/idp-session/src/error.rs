//! Session and flow error types.

use idp_core::VerifyError;
use idp_saml::SamlError;
use thiserror::Error;

/// Errors from a [`SessionStore`](crate::store::SessionStore).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Storage backend failure.
    #[error("Session storage error: {0}")]
    Storage(String),
}

/// Result type for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that end an SSO or login request.
///
/// The `Display` text of client errors is what the browser sees. Server
/// errors are logged in full and answered generically.
#[derive(Debug, Error)]
pub enum FlowError {
    /// No `SAMLRequest`, an undecodable one, or one without an issuer.
    #[error("Missing or invalid SAMLRequest (no Issuer)")]
    UnresolvableRequest,

    /// The issuer is not a registered service provider.
    #[error("Unknown SP issuer: {0}")]
    UnknownIssuer(String),

    /// Unknown user, wrong password, or not allowed for the SP.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The directory could not be used.
    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// Building or signing the response failed.
    #[error("SAML error: {0}")]
    Saml(#[from] SamlError),

    /// The session store failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl FlowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::UnresolvableRequest | Self::UnknownIssuer(_) => 400,
            Self::InvalidCredentials => 401,
            Self::DirectoryUnavailable(_) => 503,
            Self::Saml(_) | Self::Session(_) => 500,
        }
    }

    /// Whether the message may be shown to the client.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}

impl From<VerifyError> for FlowError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::InvalidCredentials => Self::InvalidCredentials,
            VerifyError::Unavailable(msg) => Self::DirectoryUnavailable(msg),
        }
    }
}

/// Result type for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;
