//! Identity provider configuration.
//!
//! The configuration file is YAML with three top-level sections:
//!
//! ```yaml
//! idp:
//!   entity_id: https://idp.example.com/metadata
//!   sso_url: https://idp.example.com/sso
//! service_providers:
//!   - entity_id: https://app.example.com
//!     acs: [{ url: https://app.example.com/acs, binding: post }]
//!     allowed_groups: [engineering]
//!     key: app
//! attribute_maps:
//!   app: { email: Email, groups: Role }
//! ```
//!
//! Parsing goes through permissive `Raw*` structs so that validation can
//! report every missing key by name instead of a generic serde error.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeMapping;
use crate::error::{ConfigError, ConfigResult};

// ============================================================================
// Bindings and endpoints
// ============================================================================

/// SAML transport binding used by an endpoint or an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    /// HTTP-Redirect: deflated, base64 query parameter.
    Redirect,
    /// HTTP-POST: base64 form field.
    Post,
}

impl Binding {
    /// Maps a configured binding name. Only `post` selects HTTP-POST.
    #[must_use]
    pub fn from_config_str(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("post") {
            Self::Post
        } else {
            Self::Redirect
        }
    }

    /// Returns the short lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Redirect => "redirect",
            Self::Post => "post",
        }
    }

    /// Returns the SAML 2.0 binding URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Redirect => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
            Self::Post => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service provider endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Endpoint URL.
    pub url: String,
    /// Binding the endpoint accepts.
    pub binding: Binding,
}

// ============================================================================
// Validated configuration
// ============================================================================

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpConfig {
    /// IdP entity ID, used as the issuer of every response.
    pub entity_id: String,
    /// Single sign-on service URL.
    pub sso_url: String,
    /// Optional single logout service URL.
    pub slo_url: Option<String>,
}

/// A configured service provider.
#[derive(Debug, Clone)]
pub struct ServiceProviderConfig {
    /// Entity ID, the registry key.
    pub entity_id: String,
    /// Assertion consumer endpoints in configured order.
    pub acs: Vec<Endpoint>,
    /// Single logout endpoints.
    pub slo: Vec<Endpoint>,
    /// Groups allowed to sign in. Empty means everyone.
    pub allowed_groups: Vec<String>,
    /// Audience override.
    pub audience: Option<String>,
    /// NameID format override.
    pub nameid_format: Option<String>,
    /// Whether the SP requires signed assertions.
    pub want_assertions_signed: bool,
    /// Whether the SP requires a signed response message.
    pub want_message_signed: bool,
    /// Attribute map key.
    pub key: Option<String>,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Identity provider settings.
    pub idp: IdpConfig,
    /// Service providers in configured order.
    pub service_providers: Vec<ServiceProviderConfig>,
    /// Attribute maps by key.
    pub attribute_maps: HashMap<String, AttributeMapping>,
}

// ============================================================================
// Raw schema
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    idp: Option<RawIdp>,
    #[serde(default)]
    service_providers: Option<Vec<Option<RawServiceProvider>>>,
    #[serde(default)]
    attribute_maps: BTreeMap<String, serde_yaml::Mapping>,
}

#[derive(Debug, Default, Deserialize)]
struct RawIdp {
    #[serde(default, alias = "entityId")]
    entity_id: Option<String>,
    #[serde(default, alias = "ssoUrl")]
    sso_url: Option<String>,
    #[serde(default, alias = "sloUrl")]
    slo_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawServiceProvider {
    #[serde(default)]
    entity_id: Option<String>,
    #[serde(default)]
    acs: Vec<RawEndpoint>,
    #[serde(default)]
    slo: Vec<RawEndpoint>,
    #[serde(default)]
    allowed_groups: Option<Vec<String>>,
    #[serde(default)]
    audience: Option<String>,
    #[serde(default)]
    nameid_format: Option<String>,
    #[serde(default)]
    want_assertions_signed: Option<bool>,
    #[serde(default)]
    want_message_signed: Option<bool>,
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEndpoint {
    url: String,
    #[serde(default)]
    binding: Option<String>,
}

impl RawEndpoint {
    fn resolve(self, default: Binding) -> Endpoint {
        Endpoint {
            url: self.url,
            binding: self
                .binding
                .as_deref()
                .map_or(default, Binding::from_config_str),
        }
    }
}

/// Treats blank strings like missing values.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text, &path.display().to_string())
    }

    /// Parses and validates configuration text.
    ///
    /// `location` is used as the prefix of every error message.
    pub fn from_yaml_str(text: &str, location: &str) -> ConfigResult<Self> {
        let raw: RawConfig = if text.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str::<Option<RawConfig>>(text)
                .map_err(|e| ConfigError::parse(location, e.to_string()))?
                .unwrap_or_default()
        };

        let idp = Self::validate_idp(raw.idp.unwrap_or_default(), location)?;

        let entries = raw.service_providers.unwrap_or_default();
        if entries.is_empty() {
            return Err(ConfigError::NoServiceProviders {
                location: location.to_string(),
            });
        }

        let mut service_providers = Vec::with_capacity(entries.len());
        for entry in entries {
            let sp = Self::validate_service_provider(entry.unwrap_or_default(), location)?;
            if service_providers
                .iter()
                .any(|existing: &ServiceProviderConfig| existing.entity_id == sp.entity_id)
            {
                return Err(ConfigError::DuplicateEntityId {
                    location: location.to_string(),
                    entity_id: sp.entity_id,
                });
            }
            service_providers.push(sp);
        }

        let mut attribute_maps = HashMap::with_capacity(raw.attribute_maps.len());
        for (name, mapping) in raw.attribute_maps {
            let parsed = AttributeMapping::from_yaml(&name, &mapping, location)?;
            attribute_maps.insert(name, parsed);
        }

        Ok(Self {
            idp,
            service_providers,
            attribute_maps,
        })
    }

    fn validate_idp(raw: RawIdp, location: &str) -> ConfigResult<IdpConfig> {
        let entity_id = non_empty(raw.entity_id);
        let sso_url = non_empty(raw.sso_url);

        let mut missing = Vec::new();
        if entity_id.is_none() {
            missing.push("idp.entity_id".to_string());
        }
        if sso_url.is_none() {
            missing.push("idp.sso_url".to_string());
        }

        match (entity_id, sso_url) {
            (Some(entity_id), Some(sso_url)) => Ok(IdpConfig {
                entity_id,
                sso_url,
                slo_url: non_empty(raw.slo_url),
            }),
            _ => Err(ConfigError::MissingKeys {
                location: location.to_string(),
                keys: missing,
            }),
        }
    }

    fn validate_service_provider(
        raw: RawServiceProvider,
        location: &str,
    ) -> ConfigResult<ServiceProviderConfig> {
        let entity_id = non_empty(raw.entity_id).ok_or_else(|| ConfigError::MissingEntityId {
            location: location.to_string(),
        })?;

        let acs: Vec<Endpoint> = raw
            .acs
            .into_iter()
            .map(|e| e.resolve(Binding::Post))
            .collect();
        if acs.is_empty() {
            return Err(ConfigError::MissingAssertionConsumer {
                location: location.to_string(),
                entity_id,
            });
        }

        Ok(ServiceProviderConfig {
            entity_id,
            acs,
            slo: raw
                .slo
                .into_iter()
                .map(|e| e.resolve(Binding::Redirect))
                .collect(),
            allowed_groups: raw.allowed_groups.unwrap_or_default(),
            audience: non_empty(raw.audience),
            nameid_format: non_empty(raw.nameid_format),
            want_assertions_signed: raw.want_assertions_signed.unwrap_or(true),
            want_message_signed: raw.want_message_signed.unwrap_or(false),
            key: non_empty(raw.key),
        })
    }
}

// ============================================================================
// Key material
// ============================================================================

/// IdP signing key and certificate, both PEM encoded.
#[derive(Clone)]
pub struct KeyMaterial {
    /// PKCS#8 or PKCS#1 private key PEM.
    pub private_key_pem: String,
    /// X.509 certificate PEM.
    pub certificate_pem: String,
}

impl KeyMaterial {
    /// File name of the private key inside the certificate directory.
    pub const PRIVATE_KEY_FILE: &'static str = "idp_private.key";

    /// File name of the certificate inside the certificate directory.
    pub const CERTIFICATE_FILE: &'static str = "idp_public.crt";

    /// Reads the key pair from a directory.
    ///
    /// Both files are required.
    pub fn load(dir: &Path) -> ConfigResult<Self> {
        let private_key_pem =
            read_required(dir.join(Self::PRIVATE_KEY_FILE), "IdP private key")?;
        let certificate_pem = read_required(dir.join(Self::CERTIFICATE_FILE), "IdP public cert")?;
        Ok(Self {
            private_key_pem,
            certificate_pem,
        })
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("private_key_pem", &"[REDACTED]")
            .field("certificate_pem", &self.certificate_pem)
            .finish()
    }
}

fn read_required(path: PathBuf, label: &'static str) -> ConfigResult<String> {
    std::fs::read_to_string(&path).map_err(|_| ConfigError::MissingKeyMaterial { label, path })
}
