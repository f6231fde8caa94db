//! HTTP handlers for the SSO, login and metadata endpoints.
//!
//! Handlers translate between HTTP and [`SessionStateMachine`] outcomes.
//! Client errors answer with their message. Server errors are logged and
//! answered with the bare status text.
//!
//! [`SessionStateMachine`]: idp_session::SessionStateMachine

use askama::Template;
use axum::{
    extract::{Query, State},
    http::{
        header::{CONTENT_TYPE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    Form,
};
use idp_core::Binding;
use idp_saml::ResponseDocument;
use idp_session::{FlowError, LoginOutcome, SessionId, SsoOutcome};
use serde::Deserialize;

use crate::state::AppState;

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    /// Relay state carried through the form.
    pub relay_state: String,
}

/// `SAMLRequest` and `RelayState`, from the query or a form body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SsoParams {
    /// Encoded `AuthnRequest`.
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,
    /// Opaque SP state.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// Query of `GET /login`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginQuery {
    /// Relay state to pre-fill.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// Form of `POST /login`.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Relay state from the hidden form field.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// `GET /`
pub async fn root() -> &'static str {
    "IdP running."
}

/// `GET|POST /metadata`
pub async fn metadata(State(state): State<AppState>) -> Response {
    (
        [(CONTENT_TYPE, "application/xml")],
        state.metadata.to_string(),
    )
        .into_response()
}

/// `GET /sso` (HTTP-Redirect binding).
pub async fn sso_redirect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SsoParams>,
) -> Response {
    sso(&state, &headers, Binding::Redirect, params).await
}

/// `POST /sso` (HTTP-POST binding).
pub async fn sso_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(params): Form<SsoParams>,
) -> Response {
    sso(&state, &headers, Binding::Post, params).await
}

async fn sso(state: &AppState, headers: &HeaderMap, binding: Binding, params: SsoParams) -> Response {
    let session = BrowserSession::resolve(state, headers);

    let outcome = state
        .machine
        .handle_sso(
            &session.id,
            binding,
            params.saml_request.as_deref(),
            params.relay_state.as_deref(),
        )
        .await;

    match outcome {
        Ok(SsoOutcome::Respond(document)) => session.attach(document_response(document)),
        Ok(SsoOutcome::LoginRequired { relay_state }) => session.attach(found(format!(
            "/login?RelayState={}",
            urlencoding::encode(&relay_state)
        ))),
        Ok(SsoOutcome::Denied) => {
            with_set_cookie(found("/login".to_string()), Some(state.cookies.clear()))
        }
        Err(e) => error_response(&e),
    }
}

/// `GET /login`
pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    let relay_state = match state.cookies.read(&headers) {
        Some(id) => match state
            .machine
            .login_relay_state(&id, query.relay_state.as_deref())
            .await
        {
            Ok(rs) => rs,
            Err(e) => return error_response(&e),
        },
        None => query.relay_state.unwrap_or_default(),
    };

    render(&LoginTemplate { relay_state })
}

/// `POST /login`
pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let session = BrowserSession::resolve(&state, &headers);

    let outcome = state
        .machine
        .handle_login(
            &session.id,
            &form.username,
            &form.password,
            form.relay_state.as_deref(),
        )
        .await;

    match outcome {
        Ok(LoginOutcome::Respond(document)) => session.attach(document_response(document)),
        Ok(LoginOutcome::Authenticated { display_name }) => {
            session.attach(format!("Logged in as {display_name}."))
        }
        Err(e) => error_response(&e),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// The browser's session, with a fresh cookie when it had none.
struct BrowserSession {
    id: SessionId,
    set_cookie: Option<String>,
}

impl BrowserSession {
    fn resolve(state: &AppState, headers: &HeaderMap) -> Self {
        match state.cookies.read(headers) {
            Some(id) => Self {
                id,
                set_cookie: None,
            },
            None => {
                let id = SessionId::generate();
                Self {
                    id,
                    set_cookie: Some(state.cookies.issue(&id)),
                }
            }
        }
    }

    fn attach(self, response: impl IntoResponse) -> Response {
        with_set_cookie(response.into_response(), self.set_cookie)
    }
}

fn with_set_cookie(mut response: Response, cookie: Option<String>) -> Response {
    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

fn document_response(document: ResponseDocument) -> Response {
    ([(CONTENT_TYPE, ResponseDocument::CONTENT_TYPE)], document.body).into_response()
}

fn render(template: &LoginTemplate) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

fn error_response(err: &FlowError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if err.is_client_error() {
        tracing::debug!(status = %status, error = %err, "Request rejected");
        return (status, err.to_string()).into_response();
    }

    tracing::error!(status = %status, error = %err, "Request failed");
    (status, status.canonical_reason().unwrap_or("Error")).into_response()
}
