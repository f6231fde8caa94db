//! Common test utilities and fixtures.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use idp_core::Binding;
use idp_integration_tests::{fixtures_dir, StubDirectory};
use idp_saml::bindings::{encode_request, HttpPostBinding};
use idp_server::{Server, ServerConfig};
use reqwest::{redirect::Policy, Client, Response};
use tokio::sync::oneshot;
use tokio::time::sleep;

/// Test environment that runs the server.
pub struct TestEnv {
    /// Base URL of the running server.
    pub base_url: String,
    /// HTTP client with a cookie store that does not follow redirects.
    pub client: Client,
    /// Server shutdown signal.
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestEnv {
    /// Starts a server backed by [`StubDirectory::standard`].
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_directory(StubDirectory::standard()).await
    }

    /// Starts a server backed by `directory`.
    pub async fn with_directory(directory: StubDirectory) -> anyhow::Result<Self> {
        // Initialize tracing for tests
        let _ = tracing_subscriber::fmt()
            .with_env_filter("idp_server=debug,idp_session=debug,tower_http=info")
            .try_init();

        // Find available port for server
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let server_port = listener.local_addr()?.port();
        drop(listener);

        let base_url = format!("http://127.0.0.1:{}", server_port);

        let fixtures = fixtures_dir();
        let mut config = ServerConfig::for_testing(fixtures.join("config.yml"), &fixtures);
        config.port = server_port;

        // Create shutdown channel
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();

        // Start server
        let server = Server::new(config, Arc::new(directory))?;
        tokio::spawn(async move {
            tokio::select! {
                result = server.run() => {
                    if let Err(e) = result {
                        tracing::error!("Server error: {}", e);
                    }
                }
                _ = shutdown_rx => {
                    tracing::info!("Server shutdown requested");
                }
            }
        });

        // Wait for server
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .cookie_store(true)
            .redirect(Policy::none())
            .build()?;

        wait_for_server(&client, &base_url).await?;

        Ok(Self {
            base_url,
            client,
            _shutdown_tx,
        })
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends an `AuthnRequest` from `issuer` on the Redirect binding.
    pub async fn sso_redirect(&self, issuer: &str, relay_state: &str) -> anyhow::Result<Response> {
        let encoded = encode_request(Binding::Redirect, &authn_request(issuer))?;
        let response = self
            .client
            .get(self.url("/sso"))
            .query(&[("SAMLRequest", encoded.as_str()), ("RelayState", relay_state)])
            .send()
            .await?;
        Ok(response)
    }

    /// Sends an `AuthnRequest` from `issuer` on the POST binding.
    pub async fn sso_post(&self, issuer: &str, relay_state: &str) -> anyhow::Result<Response> {
        let encoded = encode_request(Binding::Post, &authn_request(issuer))?;
        let response = self
            .client
            .post(self.url("/sso"))
            .form(&[("SAMLRequest", encoded.as_str()), ("RelayState", relay_state)])
            .send()
            .await?;
        Ok(response)
    }

    /// Submits the login form.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        relay_state: &str,
    ) -> anyhow::Result<Response> {
        let response = self
            .client
            .post(self.url("/login"))
            .form(&[
                ("username", username),
                ("password", password),
                ("RelayState", relay_state),
            ])
            .send()
            .await?;
        Ok(response)
    }
}

/// A minimal `AuthnRequest` from `issuer`.
pub fn authn_request(issuer: &str) -> String {
    format!(
        r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_e2e" Version="2.0" IssueInstant="2026-01-01T00:00:00Z"><saml:Issuer>{issuer}</saml:Issuer><samlp:NameIDPolicy AllowCreate="true"/></samlp:AuthnRequest>"#
    )
}

/// `Location` header of a redirect.
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// Decoded `SAMLResponse` and the `RelayState` of an auto-submit form.
pub fn posted_response(html: &str) -> anyhow::Result<(String, Option<String>)> {
    let encoded = HttpPostBinding::extract_form_value(html, "SAMLResponse")
        .ok_or_else(|| anyhow::anyhow!("no SAMLResponse in form"))?;
    let xml = HttpPostBinding::decode(encoded)?;
    let relay_state = HttpPostBinding::extract_form_value(html, "RelayState").map(String::from);
    Ok((xml, relay_state))
}

/// Waits for the server to be ready.
async fn wait_for_server(client: &Client, base_url: &str) -> anyhow::Result<()> {
    let max_attempts = 50;

    for attempt in 1..=max_attempts {
        match client.get(base_url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Server ready after {} attempts", attempt);
                return Ok(());
            }
            _ => sleep(Duration::from_millis(100)).await,
        }
    }

    anyhow::bail!("Server did not become ready at {}", base_url)
}
