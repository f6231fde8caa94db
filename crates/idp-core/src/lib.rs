//! # idp-core
//!
//! Core types for the SAML identity provider.
//!
//! This crate holds everything the SSO flow needs that is independent of
//! wire formats and transports:
//!
//! - [`config`] - YAML configuration schema, validation and key material
//! - [`registry`] - the immutable service provider registry built at startup
//! - [`profile`] - the normalized user profile produced by credential checks
//! - [`credential`] - the credential verifier contract
//! - [`policy`] - per-SP group authorization
//! - [`attributes`] - per-SP attribute projection
//!
//! ## Security
//!
//! Authentication failures are reported through [`credential::VerifyError`],
//! whose invalid-credentials variant never says whether the username exists.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attributes;
pub mod config;
pub mod credential;
pub mod error;
pub mod policy;
pub mod profile;
pub mod registry;

pub use attributes::{AttributeMapping, AttributeProjector, AttributeValue, ProfileField, ProjectedAttributes};
pub use config::{AppConfig, Binding, Endpoint, IdpConfig, KeyMaterial, ServiceProviderConfig};
pub use credential::{CredentialVerifier, VerifyError};
pub use error::{ConfigError, ConfigResult};
pub use policy::is_authorized;
pub use profile::UserProfile;
pub use registry::{ConfigRegistry, ServiceProvider};
