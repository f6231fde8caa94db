//! SAML bindings.
//!
//! - **HTTP-POST** - messages are base64-encoded and carried in HTML forms
//! - **HTTP-Redirect** - messages are deflated, base64-encoded and carried in
//!   the query string
//!
//! Inbound decoding enforces size limits on both the encoded input and the
//! inflated output.
//!
//! # Usage
//!
//! ```rust,ignore
//! use idp_saml::bindings::{HttpPostBinding, HttpRedirectBinding};
//!
//! let xml = HttpRedirectBinding::decode(&query.saml_request)?;
//! let html = HttpPostBinding::encode_response(&response_xml, acs_url, Some("relay"));
//! ```

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

use idp_core::Binding;

use crate::error::SamlResult;

/// Maximum encoded size of a Redirect-bound message (128 KB).
pub const MAX_ENCODED_SIZE_REDIRECT: usize = 128 * 1024;

/// Maximum encoded size of a POST-bound message (512 KB).
pub const MAX_ENCODED_SIZE_POST: usize = 512 * 1024;

/// Maximum inflated size of a Redirect-bound message (64 KB).
pub const MAX_DECOMPRESSED_SIZE: u64 = 64 * 1024;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest message.
    Request,
    /// Response message.
    Response,
}

impl SamlMessageType {
    /// Returns the form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// Decodes an inbound `SAMLRequest` value for the given binding into XML.
pub fn decode_request(binding: Binding, encoded: &str) -> SamlResult<String> {
    match binding {
        Binding::Redirect => HttpRedirectBinding::decode(encoded),
        Binding::Post => HttpPostBinding::decode(encoded),
    }
}

/// Encodes XML as a `SAMLRequest` value for the given binding.
///
/// This is the inverse of [`decode_request`] and is what a service provider
/// sends.
pub fn encode_request(binding: Binding, xml: &str) -> SamlResult<String> {
    match binding {
        Binding::Redirect => HttpRedirectBinding::encode(xml),
        Binding::Post => Ok(HttpPostBinding::encode(xml)),
    }
}

/// Strips whitespace some SPs wrap into long base64 values.
fn compact_base64(encoded: &str) -> String {
    encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}
