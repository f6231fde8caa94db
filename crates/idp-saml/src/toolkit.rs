//! The SAML toolkit seam.
//!
//! The SSO flow only needs two things from a SAML implementation: a signed
//! login response for a service provider and the IdP metadata. Both sit
//! behind [`SamlToolkit`] so the flow can be exercised with a stub.

use idp_core::{Binding, ConfigRegistry, IdpConfig, ServiceProvider};

use crate::bindings::HttpPostBinding;
use crate::document::{serialize_response, DocumentIds, LoginResponseParams};
use crate::error::{SamlError, SamlResult};
use crate::metadata::idp_metadata_xml;
use crate::signature::XmlSigner;

/// A response ready to be served to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDocument {
    /// `ID` of the SAML `Response`.
    pub response_id: String,
    /// ACS URL the browser will post to.
    pub destination: String,
    /// Binding of the inbound request.
    pub binding: Binding,
    /// HTML page that auto-submits the response.
    pub body: String,
}

impl ResponseDocument {
    /// Content type of [`body`](Self::body). Always HTML, whatever the binding.
    pub const CONTENT_TYPE: &'static str = "text/html; charset=utf-8";
}

/// Builds signed SAML documents for the IdP.
pub trait SamlToolkit: Send + Sync {
    /// Builds a signed login response for `sp`.
    fn create_login_response(
        &self,
        sp: &ServiceProvider,
        binding: Binding,
        params: &LoginResponseParams,
        relay_state: Option<&str>,
    ) -> SamlResult<ResponseDocument>;

    /// IdP metadata XML.
    fn metadata(&self) -> String;
}

/// Which parts of a response get signed regardless of SP preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningPolicy {
    /// Always sign the assertion.
    pub sign_assertions: bool,
    /// Always sign the response message.
    pub sign_responses: bool,
}

impl Default for SigningPolicy {
    fn default() -> Self {
        Self {
            sign_assertions: true,
            sign_responses: true,
        }
    }
}

/// [`SamlToolkit`] that writes XML directly and signs it with the IdP key.
#[derive(Debug)]
pub struct XmlToolkit {
    idp: IdpConfig,
    signer: XmlSigner,
    policy: SigningPolicy,
}

impl XmlToolkit {
    /// Creates a toolkit from the registry's IdP settings and key material.
    pub fn new(registry: &ConfigRegistry) -> SamlResult<Self> {
        let keys = registry.keys();
        let signer = XmlSigner::from_pem(&keys.private_key_pem, &keys.certificate_pem)?;
        Ok(Self {
            idp: registry.idp().clone(),
            signer,
            policy: SigningPolicy::default(),
        })
    }

    /// Overrides the signing policy.
    #[must_use]
    pub fn with_signing_policy(mut self, policy: SigningPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Serializes and signs a response, without the HTML wrapping.
    pub fn signed_response_xml(
        &self,
        sp: &ServiceProvider,
        ids: &DocumentIds,
        params: &LoginResponseParams,
    ) -> SamlResult<String> {
        let mut xml = serialize_response(&self.idp.entity_id, ids, params);

        if self.policy.sign_assertions || sp.want_assertions_signed() {
            xml = self.signer.sign(&xml, &ids.assertion_id)?;
        }
        if self.policy.sign_responses || sp.want_message_signed() {
            xml = self.signer.sign(&xml, &ids.response_id)?;
        }
        Ok(xml)
    }
}

impl SamlToolkit for XmlToolkit {
    fn create_login_response(
        &self,
        sp: &ServiceProvider,
        binding: Binding,
        params: &LoginResponseParams,
        relay_state: Option<&str>,
    ) -> SamlResult<ResponseDocument> {
        let destination = sp
            .primary_acs()
            .map(|acs| acs.url.clone())
            .ok_or_else(|| SamlError::MissingEndpoint(sp.entity_id().to_string()))?;

        let ids = DocumentIds::generate();
        let xml = self.signed_response_xml(sp, &ids, params)?;
        let body = HttpPostBinding::encode_response(&xml, &destination, relay_state);

        Ok(ResponseDocument {
            response_id: ids.response_id,
            destination,
            binding,
            body,
        })
    }

    fn metadata(&self) -> String {
        idp_metadata_xml(&self.idp, &self.signer.certificate_base64())
    }
}
