//! Enveloped XML signatures (RSA-SHA256).
//!
//! Documents signed here are produced by this crate and are written already
//! in exclusive canonical form: no whitespace between elements, attributes
//! in canonical order, every namespace declared on the first element that
//! uses it and nowhere else. Under that contract the serialized element is
//! its own canonical form and can be digested as is.

use aws_lc_rs::digest;
use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{self, KeyPair, RsaKeyPair};
use base64::Engine;

use crate::constants::{dsig, XMLDSIG_NS};
use crate::error::{SamlError, SamlResult};

/// XML document signer.
pub struct XmlSigner {
    key_pair: RsaKeyPair,
    certificate_der: Vec<u8>,
    rng: SystemRandom,
}

impl std::fmt::Debug for XmlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlSigner")
            .field("modulus_len", &self.key_pair.public_modulus_len())
            .finish_non_exhaustive()
    }
}

impl XmlSigner {
    /// Creates a signer from a PEM private key (PKCS#8 or PKCS#1) and a PEM
    /// certificate.
    pub fn from_pem(private_key_pem: &str, certificate_pem: &str) -> SamlResult<Self> {
        let key_der = pem_to_der(private_key_pem, "PRIVATE KEY")
            .or_else(|| pem_to_der(private_key_pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| SamlError::Crypto("Invalid private key PEM".to_string()))?;

        let key_pair = RsaKeyPair::from_pkcs8(&key_der)
            .or_else(|_| RsaKeyPair::from_der(&key_der))
            .map_err(|e| SamlError::Crypto(format!("Invalid RSA private key: {e}")))?;

        let certificate_der = pem_to_der(certificate_pem, "CERTIFICATE")
            .ok_or_else(|| SamlError::Crypto("Invalid certificate PEM".to_string()))?;

        Ok(Self {
            key_pair,
            certificate_der,
            rng: SystemRandom::new(),
        })
    }

    /// Base64 DER of the signing certificate, as published in metadata and
    /// `KeyInfo`.
    #[must_use]
    pub fn certificate_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.certificate_der)
    }

    /// DER-encoded RSA public key.
    #[must_use]
    pub fn public_key_der(&self) -> &[u8] {
        self.key_pair.public_key().as_ref()
    }

    /// Signs the element whose `ID` attribute equals `reference_id`.
    ///
    /// The `<ds:Signature>` is inserted right after the element's `Issuer`
    /// child, or first inside the element when there is none.
    pub fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        let (element_start, insert_position) = find_element_and_insert_position(xml, reference_id)?;
        let element = extract_element(xml, element_start)?;

        let digest = digest::digest(&digest::SHA256, element.as_bytes());
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(digest.as_ref());

        let signed_info_body = build_signed_info_body(reference_id, &digest_b64);
        let canonical_signed_info =
            format!(r#"<ds:SignedInfo xmlns:ds="{XMLDSIG_NS}">{signed_info_body}</ds:SignedInfo>"#);

        let signature_value = self.sign_data(canonical_signed_info.as_bytes())?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature_value);

        let signature_element = format!(
            r#"<ds:Signature xmlns:ds="{XMLDSIG_NS}"><ds:SignedInfo>{signed_info_body}</ds:SignedInfo><ds:SignatureValue>{signature_b64}</ds:SignatureValue><ds:KeyInfo><ds:X509Data><ds:X509Certificate>{}</ds:X509Certificate></ds:X509Data></ds:KeyInfo></ds:Signature>"#,
            self.certificate_base64()
        );

        Ok(format!(
            "{}{}{}",
            &xml[..insert_position],
            signature_element,
            &xml[insert_position..]
        ))
    }

    fn sign_data(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        let mut sig = vec![0; self.key_pair.public_modulus_len()];
        self.key_pair
            .sign(&signature::RSA_PKCS1_SHA256, &self.rng, data, &mut sig)
            .map_err(|_| SamlError::SignatureCreation("RSA signing failed".to_string()))?;
        Ok(sig)
    }
}

/// Extracts DER data from a PEM string.
fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let end_pos = pem[start..].find(&end)? + start;

    let b64_data: String = pem[start..end_pos]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD.decode(b64_data).ok()
}

/// Finds the element to sign and where its signature goes.
///
/// Returns the offset of the element's `<` and the insert offset.
fn find_element_and_insert_position(xml: &str, reference_id: &str) -> SamlResult<(usize, usize)> {
    let id_pattern = format!(" ID=\"{reference_id}\"");
    let id_pos = xml.find(&id_pattern).ok_or_else(|| {
        SamlError::SignatureCreation(format!("Element with ID '{reference_id}' not found"))
    })?;

    let tag_start = xml[..id_pos]
        .rfind('<')
        .ok_or_else(|| SamlError::SignatureCreation("Malformed XML element".to_string()))?;

    let tag_end = xml[id_pos..]
        .find('>')
        .map(|pos| id_pos + pos + 1)
        .ok_or_else(|| SamlError::SignatureCreation("Malformed XML element".to_string()))?;

    // The Issuer must be the first child for it to count.
    let insert_pos = if xml[tag_end..].starts_with("<saml:Issuer") {
        xml[tag_end..]
            .find("</saml:Issuer>")
            .map_or(tag_end, |pos| tag_end + pos + "</saml:Issuer>".len())
    } else {
        tag_end
    };

    Ok((tag_start, insert_pos))
}

/// Extracts the complete element starting at `start`, nested same-name
/// elements included.
fn extract_element(xml: &str, start: usize) -> SamlResult<String> {
    let name_end = xml[start + 1..]
        .find(|c: char| c == ' ' || c == '>' || c == '/')
        .map(|pos| start + 1 + pos)
        .ok_or_else(|| SamlError::SignatureCreation("Malformed XML element".to_string()))?;
    let tag_name = &xml[start + 1..name_end];

    let open = format!("<{tag_name}");
    let close = format!("</{tag_name}>");

    let mut depth = 0usize;
    let mut cursor = start;
    loop {
        let next_open = xml[cursor..].find(&open).map(|p| cursor + p);
        let next_close = xml[cursor..].find(&close).map(|p| cursor + p);

        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                depth += 1;
                cursor = o + open.len();
            }
            (_, Some(c)) => {
                depth = depth.saturating_sub(1);
                cursor = c + close.len();
                if depth == 0 {
                    return Ok(xml[start..cursor].to_string());
                }
            }
            _ => {
                return Err(SamlError::SignatureCreation(format!(
                    "Unclosed XML element '{tag_name}'"
                )))
            }
        }
    }
}

/// Children of `SignedInfo` for an enveloped RSA-SHA256 signature.
fn build_signed_info_body(reference_id: &str, digest_b64: &str) -> String {
    format!(
        r##"<ds:CanonicalizationMethod Algorithm="{c14n}"></ds:CanonicalizationMethod><ds:SignatureMethod Algorithm="{sig}"></ds:SignatureMethod><ds:Reference URI="#{reference_id}"><ds:Transforms><ds:Transform Algorithm="{enveloped}"></ds:Transform><ds:Transform Algorithm="{c14n}"></ds:Transform></ds:Transforms><ds:DigestMethod Algorithm="{digest}"></ds:DigestMethod><ds:DigestValue>{digest_b64}</ds:DigestValue></ds:Reference>"##,
        c14n = dsig::EXC_C14N,
        sig = dsig::RSA_SHA256,
        enveloped = dsig::ENVELOPED_SIGNATURE,
        digest = dsig::SHA256,
    )
}
