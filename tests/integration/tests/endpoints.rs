//! Root and metadata endpoint tests.

use reqwest::StatusCode;

use crate::common::TestEnv;

#[tokio::test]
async fn test_root_reports_running() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.client.get(env.url("/")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "IdP running.");

    Ok(())
}

/// Tests that the IdP metadata endpoint returns valid XML on GET and POST.
#[tokio::test]
async fn test_metadata_endpoint() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    for response in [
        env.client.get(env.url("/metadata")).send().await?,
        env.client.post(env.url("/metadata")).send().await?,
    ] {
        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        assert_eq!(content_type, "application/xml");

        let body = response.text().await?;
        assert!(
            body.contains(r#"entityID="https://idp.example.com/metadata""#),
            "Metadata should name the IdP"
        );
        assert!(
            body.contains(r#"WantAuthnRequestsSigned="false""#),
            "Metadata should not require signed requests"
        );
        assert!(
            body.contains("X509Certificate"),
            "Metadata should contain X509Certificate"
        );
        assert_eq!(
            body.matches("SingleSignOnService ").count(),
            2,
            "SSO should be offered on both bindings"
        );
        assert_eq!(
            body.matches("SingleLogoutService ").count(),
            2,
            "SLO should be offered on both bindings"
        );
    }

    Ok(())
}
