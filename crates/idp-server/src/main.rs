//! # SAML IdP server
//!
//! Main entry point. Configuration comes from the environment (and `.env`).

#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use idp_ldap::{LdapCredentialVerifier, LdapSettings};
use idp_server::{Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("SAML IdP starting...");

    let config = ServerConfig::from_env()?;
    let ldap = LdapSettings::from_env().context("invalid LDAP configuration")?;
    let verifier = Arc::new(LdapCredentialVerifier::new(ldap));

    let server = Server::new(config, verifier)?;
    server.run().await
}
