//! Configuration error types.
//!
//! Every variant is fatal: the server refuses to start when the registry
//! cannot be built. Messages name the offending file and key so an operator
//! can fix the configuration without reading the source.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading and validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Config file not found at {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid YAML for the expected schema.
    #[error("{location}: invalid configuration: {message}")]
    Parse {
        /// Where the configuration came from.
        location: String,
        /// Parser message.
        message: String,
    },

    /// Required IdP keys are missing.
    #[error("{location}: missing keys {}", keys.join(", "))]
    MissingKeys {
        /// Where the configuration came from.
        location: String,
        /// Dotted names of the missing keys, e.g. `idp.sso_url`.
        keys: Vec<String>,
    },

    /// The service provider list is absent or empty.
    #[error("{location}: at least one service_providers entry is required")]
    NoServiceProviders {
        /// Where the configuration came from.
        location: String,
    },

    /// A service provider entry has no entity ID.
    #[error("{location}: each service_providers entry must include entity_id")]
    MissingEntityId {
        /// Where the configuration came from.
        location: String,
    },

    /// Two service provider entries share an entity ID.
    #[error("{location}: duplicate service_providers entity_id {entity_id}")]
    DuplicateEntityId {
        /// Where the configuration came from.
        location: String,
        /// The repeated entity ID.
        entity_id: String,
    },

    /// A service provider has no assertion consumer endpoint.
    #[error("{location}: service provider {entity_id} must declare at least one acs endpoint")]
    MissingAssertionConsumer {
        /// Where the configuration came from.
        location: String,
        /// The service provider's entity ID.
        entity_id: String,
    },

    /// An attribute map refers to a profile field that does not exist.
    #[error("{location}: attribute_maps.{map} references unknown field {field}")]
    UnknownAttributeField {
        /// Where the configuration came from.
        location: String,
        /// The attribute map key.
        map: String,
        /// The unknown local field name.
        field: String,
    },

    /// An attribute map entry is not a string to string pair.
    #[error("{location}: attribute_maps.{map} entries must map a field name to an attribute name")]
    InvalidAttributeEntry {
        /// Where the configuration came from.
        location: String,
        /// The attribute map key.
        map: String,
    },

    /// A key material file is missing or unreadable.
    #[error("Missing {label} at {}", path.display())]
    MissingKeyMaterial {
        /// Human-readable label of the file.
        label: &'static str,
        /// Expected location.
        path: PathBuf,
    },
}

impl ConfigError {
    /// Creates a parse error.
    #[must_use]
    pub fn parse(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Returns the dotted key names this error reports as missing.
    #[must_use]
    pub fn missing_keys(&self) -> &[String] {
        match self {
            Self::MissingKeys { keys, .. } => keys,
            _ => &[],
        }
    }
}
