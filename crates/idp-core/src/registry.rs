//! Service provider registry.
//!
//! The registry is built once at startup from a validated [`AppConfig`] and
//! shared read-only through an `Arc`. Lookups by issuer are O(1).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::attributes::{AttributeProjector, ProjectedAttributes};
use crate::config::{AppConfig, Endpoint, IdpConfig, KeyMaterial, ServiceProviderConfig};
use crate::error::ConfigResult;
use crate::profile::UserProfile;

/// A registered service provider with its resolved protocol settings.
#[derive(Debug, Clone)]
pub struct ServiceProvider {
    config: ServiceProviderConfig,
}

impl ServiceProvider {
    /// Wraps a validated configuration entry.
    #[must_use]
    pub fn new(config: ServiceProviderConfig) -> Self {
        Self { config }
    }

    /// Raw configuration entry.
    #[must_use]
    pub const fn config(&self) -> &ServiceProviderConfig {
        &self.config
    }

    /// Entity ID.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.config.entity_id
    }

    /// Audience for issued assertions: the override, else the entity ID.
    #[must_use]
    pub fn audience(&self) -> &str {
        self.config
            .audience
            .as_deref()
            .unwrap_or(&self.config.entity_id)
    }

    /// First assertion consumer endpoint.
    #[must_use]
    pub fn primary_acs(&self) -> Option<&Endpoint> {
        self.config.acs.first()
    }

    /// Subject confirmation recipient: the first ACS URL.
    #[must_use]
    pub fn recipient(&self) -> &str {
        self.primary_acs().map_or("", |e| e.url.as_str())
    }

    /// Attribute map key.
    #[must_use]
    pub fn attribute_key(&self) -> Option<&str> {
        self.config.key.as_deref()
    }

    /// Whether the assertion must be signed.
    #[must_use]
    pub const fn want_assertions_signed(&self) -> bool {
        self.config.want_assertions_signed
    }

    /// Whether the response message must be signed.
    #[must_use]
    pub const fn want_message_signed(&self) -> bool {
        self.config.want_message_signed
    }
}

/// Immutable registry of the IdP and its service providers.
#[derive(Debug)]
pub struct ConfigRegistry {
    idp: IdpConfig,
    providers: HashMap<String, Arc<ServiceProvider>>,
    projector: AttributeProjector,
    keys: KeyMaterial,
}

impl ConfigRegistry {
    /// Builds a registry from validated configuration and key material.
    #[must_use]
    pub fn new(config: AppConfig, keys: KeyMaterial) -> Self {
        let providers = config
            .service_providers
            .into_iter()
            .map(|sp| (sp.entity_id.clone(), Arc::new(ServiceProvider::new(sp))))
            .collect();

        Self {
            idp: config.idp,
            providers,
            projector: AttributeProjector::new(config.attribute_maps),
            keys,
        }
    }

    /// Loads the configuration file and the key pair from `certs_dir`.
    ///
    /// Any failure is fatal for the process.
    pub fn load(config_path: &Path, certs_dir: &Path) -> ConfigResult<Self> {
        let config = AppConfig::load(config_path)?;
        let keys = KeyMaterial::load(certs_dir)?;

        tracing::info!(
            config = %config_path.display(),
            service_providers = config.service_providers.len(),
            attribute_maps = config.attribute_maps.len(),
            "Configuration loaded"
        );

        Ok(Self::new(config, keys))
    }

    /// Finds a service provider by issuer. Unknown issuers yield `None`.
    #[must_use]
    pub fn lookup(&self, issuer: &str) -> Option<Arc<ServiceProvider>> {
        self.providers.get(issuer).cloned()
    }

    /// Identity provider settings.
    #[must_use]
    pub const fn idp(&self) -> &IdpConfig {
        &self.idp
    }

    /// Signing key material.
    #[must_use]
    pub const fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    /// Number of registered service providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no service provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Projects `profile` onto the attribute set configured for `sp`.
    #[must_use]
    pub fn project_attributes(
        &self,
        sp: &ServiceProvider,
        profile: &UserProfile,
    ) -> ProjectedAttributes {
        self.projector.project(sp.attribute_key(), profile)
    }
}
