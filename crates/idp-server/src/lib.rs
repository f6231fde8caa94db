//! # idp-server
//!
//! Axum server for the SAML identity provider.
//!
//! Endpoints:
//! - `GET /` - liveness text
//! - `GET|POST /metadata` - IdP metadata
//! - `GET /sso`, `POST /sso` - `AuthnRequest` on the Redirect and POST bindings
//! - `GET /login`, `POST /login` - credential form and submission
//!
//! ## Usage
//!
//! ```ignore
//! use idp_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = Server::new(config, verifier)?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod cookie;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use router::create_router;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use idp_core::{ConfigRegistry, CredentialVerifier};
use tokio::net::TcpListener;

/// The IdP server.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// Loads and validates the YAML configuration and the signing key pair.
    /// Any configuration problem is returned here, before a socket is bound.
    pub fn new(
        config: ServerConfig,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> anyhow::Result<Self> {
        let registry = ConfigRegistry::load(&config.config_path, &config.certs_dir)
            .context("failed to load IdP configuration")?;

        let entity_id = registry.idp().entity_id.clone();
        let state = AppState::new(&config, Arc::new(registry), verifier)
            .context("failed to initialise SAML signing")?;

        tracing::info!(entity_id = %entity_id, "IdP initialised");

        Ok(Self { config, state })
    }

    /// Runs the server.
    ///
    /// This starts the HTTP server and blocks until it receives a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let app = create_router(self.state);

        // Bind to address
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on http://{}", listener.local_addr()?);

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Creates a test router without starting the server.
    pub fn test_router(&self) -> Router {
        create_router(self.state.clone())
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use idp_core::{
        AppConfig, ConfigRegistry, CredentialVerifier, KeyMaterial, UserProfile, VerifyError,
    };

    use crate::config::ServerConfig;
    use crate::state::AppState;

    pub const CONFIG: &str = r#"
idp:
  entity_id: https://idp.example.com/metadata
  sso_url: https://idp.example.com/sso
service_providers:
  - entity_id: sp1
    acs:
      - { url: https://sp1.example.com/acs, binding: post }
    key: sp1
  - entity_id: finance
    acs:
      - { url: https://finance.example.com/acs }
    allowed_groups: [finance]
attribute_maps:
  sp1: { mail: Email }
"#;

    pub const PRIVATE_KEY: &str = include_str!("../../idp-saml/tests/fixtures/idp_private.key");
    pub const CERTIFICATE: &str = include_str!("../../idp-saml/tests/fixtures/idp_public.crt");

    /// One user, plus `down` to simulate an unreachable directory.
    pub struct StubVerifier;

    #[async_trait]
    impl CredentialVerifier for StubVerifier {
        async fn verify(&self, username: &str, password: &str) -> Result<UserProfile, VerifyError> {
            match (username, password) {
                ("jdoe", "secret") => Ok(UserProfile::new("uid=jdoe,dc=example,dc=com", "jdoe")
                    .with_email("jdoe@example.com")
                    .with_display_name("Jane Doe")
                    .with_groups(["eng"])),
                ("down", _) => Err(VerifyError::unavailable("connection refused")),
                _ => Err(VerifyError::InvalidCredentials),
            }
        }
    }

    pub fn registry() -> ConfigRegistry {
        let config = AppConfig::from_yaml_str(CONFIG, "test").unwrap();
        let keys = KeyMaterial {
            private_key_pem: PRIVATE_KEY.to_string(),
            certificate_pem: CERTIFICATE.to_string(),
        };
        ConfigRegistry::new(config, keys)
    }

    pub fn app_state() -> AppState {
        let config = ServerConfig::for_testing("unused.yml", "unused");
        AppState::new(&config, Arc::new(registry()), Arc::new(StubVerifier)).unwrap()
    }

    pub fn authn_request(issuer: &str) -> String {
        format!(
            r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_req1" Version="2.0"><saml:Issuer>{issuer}</saml:Issuer></samlp:AuthnRequest>"#
        )
    }
}
