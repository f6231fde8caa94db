//! IdP metadata document.

use idp_core::{Binding, IdpConfig};

use crate::constants::{name_id_formats, MD_NS, SAMLP_NS, XMLDSIG_NS};

/// Builds the IdP `EntityDescriptor`.
///
/// Single sign-on is advertised on both bindings at `sso_url`. Single logout
/// is advertised only when `slo_url` is configured. Requests need not be
/// signed.
#[must_use]
pub fn idp_metadata_xml(idp: &IdpConfig, certificate_b64: &str) -> String {
    let bindings = [Binding::Redirect, Binding::Post];

    let slo_services: String = idp
        .slo_url
        .as_deref()
        .map(|url| {
            bindings
                .iter()
                .map(|b| {
                    format!(
                        "\n        <md:SingleLogoutService Binding=\"{}\" Location=\"{}\"/>",
                        b.uri(),
                        xml_escape(url)
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let name_id_formats: String = name_id_formats::SUPPORTED
        .iter()
        .map(|f| format!("\n        <md:NameIDFormat>{f}</md:NameIDFormat>"))
        .collect();

    let sso_services: String = bindings
        .iter()
        .map(|b| {
            format!(
                "\n        <md:SingleSignOnService Binding=\"{}\" Location=\"{}\"/>",
                b.uri(),
                xml_escape(&idp.sso_url)
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="{MD_NS}" entityID="{}">
    <md:IDPSSODescriptor WantAuthnRequestsSigned="false" protocolSupportEnumeration="{SAMLP_NS}">
        <md:KeyDescriptor use="signing">
            <ds:KeyInfo xmlns:ds="{XMLDSIG_NS}">
                <ds:X509Data>
                    <ds:X509Certificate>{certificate_b64}</ds:X509Certificate>
                </ds:X509Data>
            </ds:KeyInfo>
        </md:KeyDescriptor>{slo_services}{name_id_formats}{sso_services}
    </md:IDPSSODescriptor>
</md:EntityDescriptor>"#,
        xml_escape(&idp.entity_id),
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idp(slo: Option<&str>) -> IdpConfig {
        IdpConfig {
            entity_id: "https://idp.example.com".to_string(),
            sso_url: "https://idp.example.com/sso".to_string(),
            slo_url: slo.map(String::from),
        }
    }

    #[test]
    fn metadata_contains_required_elements() {
        let xml = idp_metadata_xml(&idp(None), "MIIC");

        assert!(xml.contains(r#"entityID="https://idp.example.com""#));
        assert!(xml.contains(r#"WantAuthnRequestsSigned="false""#));
        assert!(xml.contains("<ds:X509Certificate>MIIC</ds:X509Certificate>"));
        assert!(xml.contains(r#"<md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.com/sso"/>"#));
        assert!(xml.contains(r#"<md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp.example.com/sso"/>"#));
        assert!(xml.contains("nameid-format:emailAddress</md:NameIDFormat>"));
        assert!(!xml.contains("SingleLogoutService"));
    }

    #[test]
    fn slo_advertised_when_configured() {
        let xml = idp_metadata_xml(&idp(Some("https://idp.example.com/slo")), "MIIC");
        assert_eq!(xml.matches("<md:SingleLogoutService ").count(), 2);
        // Schema order: SLO, then NameIDFormat, then SSO.
        let slo = xml.find("SingleLogoutService").unwrap();
        let fmt = xml.find("NameIDFormat").unwrap();
        let sso = xml.find("SingleSignOnService").unwrap();
        assert!(slo < fmt && fmt < sso);
    }

    #[test]
    fn metadata_is_well_formed() {
        let xml = idp_metadata_xml(&idp(Some("https://idp/slo?a=1&b=2")), "MIIC");
        let mut reader = quick_xml::Reader::from_str(&xml);
        while !matches!(reader.read_event().unwrap(), quick_xml::events::Event::Eof) {}
    }
}
