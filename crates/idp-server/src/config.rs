//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.
//! Directory settings live in [`idp_ldap::LdapSettings`].

use std::path::PathBuf;
use std::time::Duration;

/// Session secret used when `SESSION_SECRET` is unset.
pub const DEFAULT_SESSION_SECRET: &str = "dev-secret";

/// Session idle timeout used when `SESSION_IDLE_TIMEOUT` is unset.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Path of the YAML IdP configuration.
    pub config_path: PathBuf,

    /// Directory holding `idp_private.key` and `idp_public.crt`.
    pub certs_dir: PathBuf,

    /// Secret used to sign the session cookie.
    pub session_secret: String,

    /// Serves the session cookie as `SameSite=None; Secure`, so it rides
    /// along on cross-site POST-binding requests. Requires HTTPS.
    pub secure_cookies: bool,

    /// How long an untouched session is kept.
    pub session_idle_timeout: Duration,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a port number, got {p:?}"))?,
            Err(_) => 3000,
        };

        let config_path = std::env::var("CONFIG_PATH")
            .map_or_else(|_| PathBuf::from("config/config.yml"), PathBuf::from);
        let certs_dir =
            std::env::var("CERTS_DIR").map_or_else(|_| PathBuf::from("certs"), PathBuf::from);

        let session_secret = std::env::var("SESSION_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_SECRET.to_string());

        let secure_cookies = std::env::var("SECURE_COOKIES")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let session_idle_timeout = match std::env::var("SESSION_IDLE_TIMEOUT") {
            Ok(v) => v.parse().map(Duration::from_secs).map_err(|_| {
                anyhow::anyhow!("SESSION_IDLE_TIMEOUT must be a number of seconds, got {v:?}")
            })?,
            Err(_) => DEFAULT_SESSION_IDLE_TIMEOUT,
        };

        let config = Self {
            host,
            port,
            config_path,
            certs_dir,
            session_secret,
            secure_cookies,
            session_idle_timeout,
        };

        if config.uses_default_secret() {
            tracing::warn!("SESSION_SECRET is not set; using the development default");
        }

        Ok(config)
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub fn for_testing(config_path: impl Into<PathBuf>, certs_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            config_path: config_path.into(),
            certs_dir: certs_dir.into(),
            session_secret: "test-secret".to_string(),
            secure_cookies: false,
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }

    /// Returns true when the cookie secret is the development default.
    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.session_secret == DEFAULT_SESSION_SECRET
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            config_path: PathBuf::from("config/config.yml"),
            certs_dir: PathBuf::from("certs"),
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            secure_cookies: false,
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("config_path", &self.config_path)
            .field("certs_dir", &self.certs_dir)
            .field("session_secret", &"[REDACTED]")
            .field("secure_cookies", &self.secure_cookies)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .finish()
    }
}
