//! Issuer extraction from inbound `AuthnRequest` messages.

use idp_core::Binding;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::bindings::decode_request;
use crate::error::{SamlError, SamlResult};

/// Maximum length of an Issuer value.
const MAX_ISSUER_LENGTH: usize = 1024;

/// Finds the issuer of an encoded `AuthnRequest`.
///
/// Only the direct `Issuer` child of an `AuthnRequest` root counts, with or
/// without a namespace prefix. Anything else yields `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssuerResolver;

impl IssuerResolver {
    /// Decodes `encoded` for `binding` and returns its issuer.
    ///
    /// Failures are logged and reported as `None`.
    #[must_use]
    pub fn resolve(binding: Binding, encoded: &str) -> Option<String> {
        match Self::try_resolve(binding, encoded) {
            Ok(issuer) => issuer,
            Err(e) => {
                tracing::warn!(binding = %binding, error = %e, "Failed to parse SAMLRequest for issuer");
                None
            }
        }
    }

    /// Like [`resolve`](Self::resolve) but surfaces decode errors.
    pub fn try_resolve(binding: Binding, encoded: &str) -> SamlResult<Option<String>> {
        let xml = decode_request(binding, encoded)?;
        issuer_from_xml(&xml)
    }
}

/// Reads the `Issuer` child of the `AuthnRequest` root element.
pub fn issuer_from_xml(xml: &str) -> SamlResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut root_is_request = false;
    let mut in_issuer = false;
    let mut issuer = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                let name = e.local_name();
                match depth {
                    1 => {
                        root_is_request = name.as_ref() == b"AuthnRequest";
                        if !root_is_request {
                            return Ok(None);
                        }
                    }
                    2 if name.as_ref() == b"Issuer" => in_issuer = true,
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    // Self-closing root: nothing to find.
                    return Ok(None);
                }
                if depth == 1 && e.local_name().as_ref() == b"Issuer" {
                    return Ok(None);
                }
            }
            Event::Text(e) if in_issuer => {
                let text = e
                    .unescape()
                    .map_err(|err| SamlError::XmlParse(err.to_string()))?;
                issuer.push_str(&text);
            }
            Event::CData(e) if in_issuer => {
                issuer.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(_) => {
                if in_issuer && depth == 2 {
                    let value = issuer.trim();
                    if value.is_empty() {
                        return Ok(None);
                    }
                    if value.len() > MAX_ISSUER_LENGTH {
                        return Err(SamlError::TooLarge(format!(
                            "Issuer exceeds {MAX_ISSUER_LENGTH} characters"
                        )));
                    }
                    return Ok(Some(value.to_string()));
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(None);
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}
