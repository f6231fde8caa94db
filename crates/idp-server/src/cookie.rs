//! Signed session cookie.
//!
//! The cookie carries only the session ID followed by an HMAC-SHA256 tag:
//! `idp_session=<uuid>.<base64url tag>`. Session contents stay server side.
//!
//! ## Security
//!
//! - always `HttpOnly`
//! - `SameSite=Lax` over plain HTTP; `SameSite=None; Secure` when configured,
//!   so the cookie survives the cross-site POST of the HTTP-POST binding
//! - Tags are checked in constant time by `aws-lc-rs`
//! - A cookie with a bad tag is ignored, as if none was sent

use aws_lc_rs::hmac;
use axum::http::{header::COOKIE, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use idp_session::SessionId;

/// Cookie name for browser sessions.
pub const SESSION_COOKIE_NAME: &str = "idp_session";

/// Issues and reads the session cookie.
pub struct SessionCookie {
    key: hmac::Key,
    secure: bool,
}

impl SessionCookie {
    /// Creates a cookie codec keyed with `secret`.
    #[must_use]
    pub fn new(secret: &str, secure: bool) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
            secure,
        }
    }

    /// `Set-Cookie` value binding the browser to `id`.
    #[must_use]
    pub fn issue(&self, id: &SessionId) -> String {
        format!(
            "{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; {}",
            self.sign(id),
            self.site_attributes()
        )
    }

    /// `Set-Cookie` value that removes the cookie.
    #[must_use]
    pub fn clear(&self) -> String {
        format!(
            "{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; {}; Max-Age=0",
            self.site_attributes()
        )
    }

    /// Session ID from the request's `Cookie` headers, if present and intact.
    pub fn read(&self, headers: &HeaderMap) -> Option<SessionId> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|part| part.trim().strip_prefix(SESSION_COOKIE_NAME)?.strip_prefix('='))
            .find_map(|value| self.verify(value.trim()))
    }

    fn sign(&self, id: &SessionId) -> String {
        let id = id.to_string();
        let tag = hmac::sign(&self.key, id.as_bytes());
        format!("{id}.{}", URL_SAFE_NO_PAD.encode(tag.as_ref()))
    }

    fn verify(&self, value: &str) -> Option<SessionId> {
        let (id, tag) = value.split_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
        if hmac::verify(&self.key, id.as_bytes(), &tag).is_err() {
            tracing::debug!("Ignoring session cookie with a bad signature");
            return None;
        }
        id.parse().ok()
    }

    /// Browsers drop `SameSite=None` cookies that are not `Secure`.
    const fn site_attributes(&self) -> &'static str {
        if self.secure {
            "SameSite=None; Secure"
        } else {
            "SameSite=Lax"
        }
    }
}

impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}
