//! # idp-saml
//!
//! SAML 2.0 for the identity provider side of Web Browser SSO.
//!
//! - [`bindings`] - HTTP-Redirect and HTTP-POST encodings with size limits
//! - [`issuer`] - issuer extraction from inbound `AuthnRequest` messages
//! - [`document`] - login response serialization
//! - [`signature`] - enveloped RSA-SHA256 signatures
//! - [`metadata`] - the IdP `EntityDescriptor`
//! - [`toolkit`] - the [`SamlToolkit`] seam and its XML implementation
//! - [`orchestrator`] - computes response fields from a profile and an SP
//!
//! # Example
//!
//! ```rust,ignore
//! use idp_saml::{ResponseOrchestrator, XmlToolkit};
//!
//! let toolkit = Arc::new(XmlToolkit::new(&registry)?);
//! let orchestrator = ResponseOrchestrator::new(registry.clone(), toolkit);
//! let document = orchestrator.build_response(&sp, binding, &profile, relay_state)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod constants;
pub mod document;
pub mod error;
pub mod issuer;
pub mod metadata;
pub mod orchestrator;
pub mod signature;
pub mod toolkit;

pub use document::LoginResponseParams;
pub use error::{SamlError, SamlResult};
pub use issuer::IssuerResolver;
pub use orchestrator::ResponseOrchestrator;
pub use signature::XmlSigner;
pub use toolkit::{ResponseDocument, SamlToolkit, SigningPolicy, XmlToolkit};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use idp_core::{AppConfig, AttributeProjector, ConfigRegistry, KeyMaterial, UserProfile};

    use crate::document::LoginResponseParams;

    pub const CONFIG: &str = r#"
idp:
  entity_id: https://idp.example.com
  sso_url: https://idp.example.com/sso
service_providers:
  - entity_id: sp1
    acs:
      - { url: https://sp1.example.com/acs, binding: post }
    audience: https://sp1.example.com
    key: sp1
  - entity_id: https://sp2.example.com
    acs:
      - { url: https://sp2.example.com/acs }
    audience: urn:sp2
    nameid_format: urn:oasis:names:tc:SAML:2.0:nameid-format:persistent
attribute_maps:
  sp1: { mail: Email }
"#;

    pub fn registry() -> ConfigRegistry {
        let config = AppConfig::from_yaml_str(CONFIG, "test").unwrap();
        let keys = KeyMaterial {
            private_key_pem: include_str!("../tests/fixtures/idp_private.key").to_string(),
            certificate_pem: include_str!("../tests/fixtures/idp_public.crt").to_string(),
        };
        ConfigRegistry::new(config, keys)
    }

    pub fn params() -> LoginResponseParams {
        let now = Utc::now();
        let profile = UserProfile::new("uid=jdoe", "jdoe").with_email("jdoe@example.com");
        LoginResponseParams {
            name_id: "jdoe@example.com".to_string(),
            name_id_format: crate::constants::name_id_formats::EMAIL.to_string(),
            session_index: "s".to_string(),
            authn_context_class_ref: crate::constants::AUTHN_CONTEXT_PASSWORD_PROTECTED_TRANSPORT
                .to_string(),
            audience: "https://sp1.example.com".to_string(),
            recipient: "https://sp1.example.com/acs".to_string(),
            issue_instant: now,
            not_before: now,
            not_on_or_after: now,
            subject_not_on_or_after: now,
            attributes: AttributeProjector::default().project(None, &profile),
        }
    }
}
