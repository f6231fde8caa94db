//! SSO and login flow tests.

use reqwest::StatusCode;

use crate::common::{location, posted_response, TestEnv};

/// Redirect-bound request without a session, then a correct login.
#[tokio::test]
async fn test_redirect_sso_then_login_issues_email_name_id() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.sso_redirect("sp1", "page=home").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/login?RelayState=page%3Dhome"));

    // The login form carries the pending relay state
    let page = env.client.get(env.url("/login")).send().await?.text().await?;
    assert!(page.contains(r#"name="RelayState" value="page=home""#));

    let response = env.login("jdoe", "secret", "").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(content_type.starts_with("text/html"), "got {content_type}");

    let html = response.text().await?;
    assert!(html.contains(r#"action="https://sp1.example.com/acs""#));

    let (xml, relay_state) = posted_response(&html)?;
    assert_eq!(relay_state.as_deref(), Some("page=home"));
    assert!(xml.contains(
        r#"Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">jdoe@example.com</saml:NameID>"#
    ));
    assert!(xml.contains(r#"Destination="https://sp1.example.com/acs""#));
    assert!(xml.contains("<saml:Audience>sp1</saml:Audience>"));
    assert!(xml.contains(r#"<saml:Attribute Name="Email""#));
    assert!(xml.contains(r#"<saml:Attribute Name="DisplayName""#));
    assert!(!xml.contains(r#"Name="groups""#));
    assert_eq!(xml.matches("<ds:Signature ").count(), 2);

    Ok(())
}

/// The POST binding is remembered through the login.
#[tokio::test]
async fn test_post_sso_then_login() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.sso_post("sp1", "").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/login?RelayState="));

    let response = env.login("jdoe", "secret", "from-form").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let (xml, relay_state) = posted_response(&response.text().await?)?;
    assert_eq!(relay_state.as_deref(), Some("from-form"));
    assert!(xml.contains(">jdoe@example.com</saml:NameID>"));

    Ok(())
}

/// An authenticated session is answered without a second login.
#[tokio::test]
async fn test_authenticated_session_gets_immediate_response() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.login("jdoe", "secret", "").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "Logged in as Jane Doe.");

    let response = env.sso_redirect("sp1", "again").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let (xml, relay_state) = posted_response(&response.text().await?)?;
    assert_eq!(relay_state.as_deref(), Some("again"));
    assert!(xml.contains(">jdoe@example.com</saml:NameID>"));

    Ok(())
}

/// An authenticated user outside the SP's groups loses the session.
#[tokio::test]
async fn test_denied_session_is_cleared() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    env.login("jdoe", "secret", "").await?;

    let response = env.sso_redirect("https://finance.example.com", "x").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/login"));

    // Back to anonymous: the next request is parked for login
    let response = env.sso_redirect("sp1", "").await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/login?RelayState="));

    Ok(())
}

/// Denied authorization at login looks like bad credentials.
#[tokio::test]
async fn test_login_outside_allowed_groups_is_401() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    env.sso_redirect("https://finance.example.com", "fin").await?;

    let response = env.login("jdoe", "secret", "").await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.text().await?, "Invalid credentials");

    // The request is still pending for an allowed user
    let response = env.login("alice", "wonderland", "").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let html = response.text().await?;
    assert!(html.contains(r#"action="https://finance.example.com/saml/acs""#));

    let (xml, relay_state) = posted_response(&html)?;
    assert_eq!(relay_state.as_deref(), Some("fin"));
    assert!(xml.contains(
        r#"Format="urn:oasis:names:tc:SAML:2.0:nameid-format:persistent">alice</saml:NameID>"#
    ));
    assert!(xml.contains("<saml:Audience>urn:finance</saml:Audience>"));
    // Unmapped SP: the six default attributes, empty ones included
    for name in ["email", "displayName", "givenName", "sn", "groups", "uid"] {
        assert!(
            xml.contains(&format!(r#"<saml:Attribute Name="{name}""#)),
            "missing attribute {name}"
        );
    }

    Ok(())
}

/// Unknown user and wrong password are indistinguishable.
#[tokio::test]
async fn test_bad_credentials_are_uniform() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    for (username, password) in [("jdoe", "wrong"), ("nobody", "secret"), ("jdoe", "")] {
        let response = env.login(username, password, "").await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.text().await?, "Invalid credentials");
    }

    Ok(())
}

/// Unresolvable and unknown issuers are client errors.
#[tokio::test]
async fn test_bad_requests_are_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.client.get(env.url("/sso")).send().await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await?,
        "Missing or invalid SAMLRequest (no Issuer)"
    );

    let response = env
        .client
        .get(env.url("/sso?SAMLRequest=bm90IHhtbA%3D%3D"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = env.sso_redirect("https://unknown.example.com", "").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await?,
        "Unknown SP issuer: https://unknown.example.com"
    );

    Ok(())
}
