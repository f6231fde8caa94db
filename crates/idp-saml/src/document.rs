//! SAML `Response` serialization.
//!
//! The output is written in exclusive canonical form (see
//! [`signature`](crate::signature)) so it can be signed without a separate
//! canonicalization pass. That means:
//!
//! - no XML declaration and no whitespace between elements
//! - attributes sorted by name, namespace declarations first
//! - empty elements written as start/end pairs
//! - `xmlns:saml` declared on the response `Issuer` and on the `Assertion`,
//!   not on the `Response`, so the assertion stays self-contained

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use idp_core::{AttributeValue, ProjectedAttributes};
use uuid::Uuid;

use crate::constants::{ATTRNAME_FORMAT_BASIC, CM_BEARER, SAMLP_NS, SAML_NS, STATUS_SUCCESS};

/// Everything that varies between two login responses.
#[derive(Debug, Clone)]
pub struct LoginResponseParams {
    /// Subject name identifier.
    pub name_id: String,
    /// Name identifier format URI.
    pub name_id_format: String,
    /// Session index of the authentication statement.
    pub session_index: String,
    /// Authentication context class URI.
    pub authn_context_class_ref: String,
    /// Audience restriction.
    pub audience: String,
    /// Subject confirmation recipient and response destination.
    pub recipient: String,
    /// Issue and authentication instant.
    pub issue_instant: DateTime<Utc>,
    /// Start of the assertion validity window.
    pub not_before: DateTime<Utc>,
    /// End of the assertion validity window.
    pub not_on_or_after: DateTime<Utc>,
    /// End of the bearer confirmation window.
    pub subject_not_on_or_after: DateTime<Utc>,
    /// Released attributes, in release order.
    pub attributes: ProjectedAttributes,
}

/// Identifiers of a serialized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIds {
    /// `ID` of the `Response`.
    pub response_id: String,
    /// `ID` of the `Assertion`.
    pub assertion_id: String,
}

impl DocumentIds {
    /// Fresh random identifiers.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            response_id: new_id(),
            assertion_id: new_id(),
        }
    }
}

/// Generates an XML ID. IDs must not start with a digit.
fn new_id() -> String {
    format!("_{}", Uuid::new_v4().simple())
}

/// Formats an instant as `xs:dateTime` in UTC.
#[must_use]
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Serializes an unsigned login response.
#[must_use]
pub fn serialize_response(issuer: &str, ids: &DocumentIds, params: &LoginResponseParams) -> String {
    let instant = format_instant(&params.issue_instant);
    let issuer = escape_text(issuer);

    let mut xml = String::with_capacity(2048);
    let _ = write!(
        xml,
        r#"<samlp:Response xmlns:samlp="{SAMLP_NS}" Destination="{}" ID="{}" IssueInstant="{instant}" Version="2.0">"#,
        escape_attr(&params.recipient),
        ids.response_id,
    );
    let _ = write!(xml, r#"<saml:Issuer xmlns:saml="{SAML_NS}">{issuer}</saml:Issuer>"#);
    let _ = write!(
        xml,
        r#"<samlp:Status><samlp:StatusCode Value="{STATUS_SUCCESS}"></samlp:StatusCode></samlp:Status>"#
    );
    xml.push_str(&serialize_assertion(&issuer, &ids.assertion_id, &instant, params));
    xml.push_str("</samlp:Response>");
    xml
}

/// `issuer` is already escaped.
fn serialize_assertion(issuer: &str, id: &str, instant: &str, params: &LoginResponseParams) -> String {
    let mut xml = String::with_capacity(1536);
    let _ = write!(
        xml,
        r#"<saml:Assertion xmlns:saml="{SAML_NS}" ID="{id}" IssueInstant="{instant}" Version="2.0">"#
    );
    let _ = write!(xml, "<saml:Issuer>{issuer}</saml:Issuer>");

    let _ = write!(
        xml,
        r#"<saml:Subject><saml:NameID Format="{}">{}</saml:NameID><saml:SubjectConfirmation Method="{CM_BEARER}"><saml:SubjectConfirmationData NotOnOrAfter="{}" Recipient="{}"></saml:SubjectConfirmationData></saml:SubjectConfirmation></saml:Subject>"#,
        escape_attr(&params.name_id_format),
        escape_text(&params.name_id),
        format_instant(&params.subject_not_on_or_after),
        escape_attr(&params.recipient),
    );

    let _ = write!(
        xml,
        r#"<saml:Conditions NotBefore="{}" NotOnOrAfter="{}"><saml:AudienceRestriction><saml:Audience>{}</saml:Audience></saml:AudienceRestriction></saml:Conditions>"#,
        format_instant(&params.not_before),
        format_instant(&params.not_on_or_after),
        escape_text(&params.audience),
    );

    let _ = write!(
        xml,
        r#"<saml:AuthnStatement AuthnInstant="{instant}" SessionIndex="{}"><saml:AuthnContext><saml:AuthnContextClassRef>{}</saml:AuthnContextClassRef></saml:AuthnContext></saml:AuthnStatement>"#,
        escape_attr(&params.session_index),
        escape_text(&params.authn_context_class_ref),
    );

    if !params.attributes.is_empty() {
        xml.push_str("<saml:AttributeStatement>");
        for (name, value) in params.attributes.iter() {
            let _ = write!(
                xml,
                r#"<saml:Attribute Name="{}" NameFormat="{ATTRNAME_FORMAT_BASIC}">"#,
                escape_attr(name)
            );
            write_values(&mut xml, value);
            xml.push_str("</saml:Attribute>");
        }
        xml.push_str("</saml:AttributeStatement>");
    }

    xml.push_str("</saml:Assertion>");
    xml
}

fn write_values(xml: &mut String, value: &AttributeValue) {
    for v in value.values() {
        let _ = write!(xml, "<saml:AttributeValue>{}</saml:AttributeValue>", escape_text(v));
    }
}

/// Escapes character data the way canonical XML writes it.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes an attribute value the way canonical XML writes it.
fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}
