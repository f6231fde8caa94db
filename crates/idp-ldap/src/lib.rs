//! # idp-ldap
//!
//! LDAP credential verification using `ldap3`.
//!
//! A verification runs two sequential, independent connections:
//!
//! 1. a service-account connection that looks the user up by username
//! 2. a user connection that binds as the found DN with the supplied password
//!
//! The first connection is closed before the second is opened. Both go
//! through [`connection::DirectoryConnector`], so the verifier can run
//! against an in-memory directory.
//!
//! ## Security
//!
//! Unknown usernames and wrong passwords both surface as
//! [`idp_core::VerifyError::InvalidCredentials`]. Passwords and bind
//! credentials are never logged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod error;
pub mod search;
pub mod verifier;

pub use config::LdapSettings;
pub use connection::{DirectoryConnector, DirectorySession, Ldap3Connector};
pub use error::{LdapError, LdapResult};
pub use search::LdapEntry;
pub use verifier::LdapCredentialVerifier;
