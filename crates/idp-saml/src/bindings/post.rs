//! HTTP-POST binding.
//!
//! Outbound responses are delivered as an HTML page that auto-submits a form
//! to the service provider's assertion consumer service.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{compact_base64, SamlMessageType, MAX_ENCODED_SIZE_POST};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Base64-encodes a message.
    #[must_use]
    pub fn encode(xml: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(xml)
    }

    /// Encodes a SAML response as an auto-submitting HTML form.
    #[must_use]
    pub fn encode_response(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        Self::encode_form(xml, destination, relay_state, SamlMessageType::Response)
    }

    fn encode_form(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> String {
        let encoded = Self::encode(xml);
        let param_name = message_type.form_param();

        let relay_state_input = relay_state
            .filter(|rs| !rs.is_empty())
            .map(|rs| {
                format!(
                    r#"<input type="hidden" name="RelayState" value="{}"/>"#,
                    html_escape(rs)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Signing in</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            param_name,
            encoded,
            relay_state_input
        )
    }

    /// Decodes a base64 message into XML.
    pub fn decode(encoded: &str) -> SamlResult<String> {
        if encoded.len() > MAX_ENCODED_SIZE_POST {
            return Err(SamlError::TooLarge(format!(
                "encoded message exceeds {MAX_ENCODED_SIZE_POST} bytes"
            )));
        }

        let decoded = base64::engine::general_purpose::STANDARD.decode(compact_base64(encoded))?;

        String::from_utf8(decoded)
            .map_err(|e| SamlError::InvalidRequest(format!("Invalid UTF-8 in message: {e}")))
    }

    /// Extracts the value of a hidden form field from a page produced by
    /// [`encode_response`](Self::encode_response).
    #[must_use]
    pub fn extract_form_value<'a>(html: &'a str, name: &str) -> Option<&'a str> {
        let marker = format!(r#"name="{name}" value=""#);
        let start = html.find(&marker)? + marker.len();
        let end = html[start..].find('"')?;
        Some(&html[start..start + end])
    }
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
