//! Startup validation tests.

use std::sync::Arc;

use idp_core::KeyMaterial;
use idp_integration_tests::{fixtures_dir, StubDirectory};
use idp_server::{Server, ServerConfig};

/// Writes `config` plus the fixture key pair into a fresh directory.
fn deployment(config: &str) -> anyhow::Result<(tempfile::TempDir, ServerConfig)> {
    let dir = tempfile::tempdir()?;
    let fixtures = fixtures_dir();
    for file in [KeyMaterial::PRIVATE_KEY_FILE, KeyMaterial::CERTIFICATE_FILE] {
        std::fs::copy(fixtures.join(file), dir.path().join(file))?;
    }
    let config_path = dir.path().join("config.yml");
    std::fs::write(&config_path, config)?;

    let server_config = ServerConfig::for_testing(config_path, dir.path());
    Ok((dir, server_config))
}

fn fixture_config() -> anyhow::Result<String> {
    Ok(std::fs::read_to_string(fixtures_dir().join("config.yml"))?)
}

#[test]
fn test_missing_sso_url_names_the_key() -> anyhow::Result<()> {
    let config = fixture_config()?.replace("  sso_url: https://idp.example.com/sso\n", "");
    let (_dir, server_config) = deployment(&config)?;

    let result = Server::new(server_config, Arc::new(StubDirectory::standard()));
    let message = format!("{:#}", result.err().ok_or_else(|| anyhow::anyhow!("server started"))?);
    assert!(message.contains("idp.sso_url"), "got: {message}");

    Ok(())
}

#[test]
fn test_missing_config_file_fails() -> anyhow::Result<()> {
    let (dir, mut server_config) = deployment("")?;
    server_config.config_path = dir.path().join("absent.yml");

    let result = Server::new(server_config, Arc::new(StubDirectory::standard()));
    let message = format!("{:#}", result.err().ok_or_else(|| anyhow::anyhow!("server started"))?);
    assert!(message.contains("Config file not found"), "got: {message}");

    Ok(())
}

#[test]
fn test_empty_service_providers_fails() -> anyhow::Result<()> {
    let config = "idp:\n  entity_id: https://idp.example.com\n  sso_url: https://idp.example.com/sso\nservice_providers: []\n";
    let (_dir, server_config) = deployment(config)?;

    let result = Server::new(server_config, Arc::new(StubDirectory::standard()));
    let message = format!("{:#}", result.err().ok_or_else(|| anyhow::anyhow!("server started"))?);
    assert!(message.contains("service_providers"), "got: {message}");

    Ok(())
}

#[test]
fn test_fixture_deployment_starts() -> anyhow::Result<()> {
    let (_dir, server_config) = deployment(&fixture_config()?)?;
    Server::new(server_config, Arc::new(StubDirectory::standard()))?;
    Ok(())
}
