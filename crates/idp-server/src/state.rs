//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use idp_core::{ConfigRegistry, CredentialVerifier};
use idp_saml::{ResponseOrchestrator, XmlToolkit};
use idp_session::{InMemorySessionStore, SessionStateMachine, SessionStore};

use crate::config::ServerConfig;
use crate::cookie::SessionCookie;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// SSO and login flow.
    pub machine: SessionStateMachine,

    /// Session cookie codec.
    pub cookies: Arc<SessionCookie>,

    /// Rendered IdP metadata. The registry is immutable, so it never changes.
    pub metadata: Arc<str>,
}

impl AppState {
    /// Wires the SAML toolkit, the session store and the state machine.
    ///
    /// Fails when the IdP key pair cannot be loaded for signing.
    pub fn new(
        config: &ServerConfig,
        registry: Arc<ConfigRegistry>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> anyhow::Result<Self> {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::with_idle_timeout(
            config.session_idle_timeout,
        ));
        Self::with_store(config, registry, verifier, store)
    }

    /// Like [`AppState::new`] with a caller-provided session store.
    pub fn with_store(
        config: &ServerConfig,
        registry: Arc<ConfigRegistry>,
        verifier: Arc<dyn CredentialVerifier>,
        store: Arc<dyn SessionStore>,
    ) -> anyhow::Result<Self> {
        let toolkit = Arc::new(XmlToolkit::new(&registry)?);
        let orchestrator = ResponseOrchestrator::new(registry.clone(), toolkit);
        let metadata = Arc::from(orchestrator.toolkit().metadata());
        let machine = SessionStateMachine::new(registry, verifier, orchestrator, store);

        Ok(Self {
            machine,
            cookies: Arc::new(SessionCookie::new(
                &config.session_secret,
                config.secure_cookies,
            )),
            metadata,
        })
    }
}
