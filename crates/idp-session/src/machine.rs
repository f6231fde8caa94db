//! The SSO state machine.
//!
//! Two entry points drive a browser session:
//!
//! - [`SessionStateMachine::handle_sso`] for an inbound `AuthnRequest`
//! - [`SessionStateMachine::handle_login`] for a credential submission
//!
//! A session moves between three shapes: empty, pending (an SSO request is
//! waiting for login) and authenticated. A pending request is consumed by the
//! login that completes it.

use std::sync::Arc;

use idp_core::{
    is_authorized, Binding, ConfigRegistry, CredentialVerifier, ServiceProvider, VerifyError,
};
use idp_saml::{IssuerResolver, ResponseDocument, ResponseOrchestrator};

use crate::error::{FlowError, FlowResult};
use crate::state::{PendingRequest, SessionId};
use crate::store::SessionStore;

/// Result of an inbound SSO request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsoOutcome {
    /// The session was authenticated and allowed: serve the response.
    Respond(ResponseDocument),
    /// The request is pending: send the browser to the login form.
    LoginRequired {
        /// Relay state to carry to the login form, empty when none.
        relay_state: String,
    },
    /// The authenticated user may not use this SP. The session is gone.
    Denied,
}

/// Result of a successful credential submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A pending request was completed: serve the response.
    Respond(ResponseDocument),
    /// No request was pending.
    Authenticated {
        /// Display name, or username when the directory has none.
        display_name: String,
    },
}

/// Drives SSO and login requests against the session store.
#[derive(Clone)]
pub struct SessionStateMachine {
    registry: Arc<ConfigRegistry>,
    verifier: Arc<dyn CredentialVerifier>,
    orchestrator: ResponseOrchestrator,
    store: Arc<dyn SessionStore>,
}

impl SessionStateMachine {
    /// Creates a state machine.
    pub fn new(
        registry: Arc<ConfigRegistry>,
        verifier: Arc<dyn CredentialVerifier>,
        orchestrator: ResponseOrchestrator,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            registry,
            verifier,
            orchestrator,
            store,
        }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConfigRegistry> {
        &self.registry
    }

    /// Returns the orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &ResponseOrchestrator {
        &self.orchestrator
    }

    /// Handles an inbound `AuthnRequest`.
    ///
    /// `saml_request` is the raw `SAMLRequest` parameter for `binding`.
    pub async fn handle_sso(
        &self,
        session: &SessionId,
        binding: Binding,
        saml_request: Option<&str>,
        relay_state: Option<&str>,
    ) -> FlowResult<SsoOutcome> {
        let issuer = saml_request
            .filter(|r| !r.is_empty())
            .and_then(|r| IssuerResolver::resolve(binding, r))
            .ok_or(FlowError::UnresolvableRequest)?;

        let sp = self.lookup(&issuer)?;
        let relay_state = relay_state.unwrap_or_default().to_string();
        let mut state = self.store.get(session).await?;

        if let Some(profile) = &state.identity {
            if !is_authorized(sp.config(), profile) {
                tracing::info!(
                    sp = %sp.entity_id(),
                    username = %profile.username,
                    "User not in allowed groups, clearing session"
                );
                self.store.destroy(session).await?;
                return Ok(SsoOutcome::Denied);
            }

            let document = self.orchestrator.build_response(
                &sp,
                binding,
                profile,
                non_empty(Some(relay_state.as_str())),
            )?;
            return Ok(SsoOutcome::Respond(document));
        }

        tracing::debug!(sp = %sp.entity_id(), binding = %binding, "SSO request pending login");
        state.pending = Some(PendingRequest {
            binding,
            issuer,
            relay_state: relay_state.clone(),
        });
        self.store.put(session, state).await?;

        Ok(SsoOutcome::LoginRequired { relay_state })
    }

    /// Handles a credential submission.
    ///
    /// A verified user is stored in the session before any pending request
    /// is looked at, so a group denial still leaves them logged in for
    /// other SPs. The denial itself yields [`FlowError::InvalidCredentials`],
    /// the same as a failed verification, and keeps the request pending.
    /// A failed verification leaves the session untouched.
    pub async fn handle_login(
        &self,
        session: &SessionId,
        username: &str,
        password: &str,
        relay_state: Option<&str>,
    ) -> FlowResult<LoginOutcome> {
        let profile = self
            .verifier
            .verify(username, password)
            .await
            .map_err(|e| {
                match &e {
                    VerifyError::InvalidCredentials => tracing::debug!("Login rejected"),
                    VerifyError::Unavailable(reason) => {
                        tracing::error!(reason = %reason, "Credential verification unavailable");
                    }
                }
                FlowError::from(e)
            })?;

        let mut state = self.store.get(session).await?;
        state.identity = Some(profile.clone());
        self.store.put(session, state.clone()).await?;
        tracing::info!(username = %profile.username, "User logged in");

        let Some(pending) = state.pending.clone() else {
            return Ok(LoginOutcome::Authenticated {
                display_name: profile.greeting_name().to_string(),
            });
        };

        let sp = self.lookup(&pending.issuer)?;
        if !is_authorized(sp.config(), &profile) {
            tracing::debug!(
                sp = %sp.entity_id(),
                username = %profile.username,
                "Login rejected: user not in allowed groups"
            );
            return Err(FlowError::InvalidCredentials);
        }

        let relay_state =
            non_empty(relay_state).or_else(|| non_empty(Some(pending.relay_state.as_str())));
        let document = self
            .orchestrator
            .build_response(&sp, pending.binding, &profile, relay_state)?;

        tracing::debug!(sp = %sp.entity_id(), "Pending request completed");
        state.pending = None;
        self.store.put(session, state).await?;

        Ok(LoginOutcome::Respond(document))
    }

    /// Relay state for the login form: the query value, else the pending
    /// request's, else empty.
    pub async fn login_relay_state(
        &self,
        session: &SessionId,
        query_relay_state: Option<&str>,
    ) -> FlowResult<String> {
        if let Some(rs) = non_empty(query_relay_state) {
            return Ok(rs.to_string());
        }
        let state = self.store.get(session).await?;
        Ok(state.pending_relay_state().unwrap_or_default().to_string())
    }

    fn lookup(&self, issuer: &str) -> FlowResult<Arc<ServiceProvider>> {
        self.registry.lookup(issuer).ok_or_else(|| {
            tracing::warn!(issuer = %issuer, "Unknown SP issuer");
            FlowError::UnknownIssuer(issuer.to_string())
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
