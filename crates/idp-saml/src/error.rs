//! SAML error types.
//!
//! Covers decoding of inbound messages and building or signing outbound
//! documents.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Invalid SAML request format or content.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Message exceeds a size limit.
    #[error("message too large: {0}")]
    TooLarge(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate compression or decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// The service provider has no usable endpoint.
    #[error("no assertion consumer service for {0}")]
    MissingEndpoint(String),

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// Key material could not be used.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SamlError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::TooLarge(_)
            | Self::XmlParse(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_) => 400,
            Self::MissingEndpoint(_) | Self::SignatureCreation(_) | Self::Crypto(_) => 500,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}
