//! Tests for configuration resolution and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate IMPORTER_* variables are marked with #[serial].

use importer_common::config::{
    load_toml_config, ClientConfig, CompiledDefaults, ConfigOverrides, ENV_ACCESS_TOKEN,
    ENV_API_BASE, ENV_CONFIG_PATH,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

fn clear_env() {
    env::remove_var(ENV_API_BASE);
    env::remove_var(ENV_ACCESS_TOKEN);
    env::remove_var(ENV_CONFIG_PATH);
}

fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).expect("Failed to write config");
    path
}

fn overrides_with_path(path: PathBuf) -> ConfigOverrides {
    ConfigOverrides {
        config_path: Some(path),
        ..Default::default()
    }
}

#[test]
#[serial]
fn test_missing_config_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();

    let config = ClientConfig::resolve(&overrides_with_path(dir.path().join("missing.toml")));
    let defaults = CompiledDefaults::default();

    assert_eq!(config.api_base, defaults.api_base);
    assert!(config.access_token.is_none());
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.event_capacity, 100);
    assert_eq!(config.log_level, "info");
}

#[test]
#[serial]
fn test_toml_values_are_used() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
api_base = "https://example.test/rest/"
access_token = "from-toml"
request_timeout_secs = 5
event_capacity = 250

[logging]
level = "debug"
"#,
    );

    let config = ClientConfig::resolve(&overrides_with_path(path));

    assert_eq!(config.api_base, "https://example.test/rest");
    assert_eq!(config.access_token.as_deref(), Some("from-toml"));
    assert_eq!(config.request_timeout, Duration::from_secs(5));
    assert_eq!(config.event_capacity, 250);
    assert_eq!(config.log_level, "debug");
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "api_base = \"https://toml.test\"\naccess_token = \"t1\"\n");

    env::set_var(ENV_API_BASE, "https://env.test");
    env::set_var(ENV_ACCESS_TOKEN, "t2");

    let config = ClientConfig::resolve(&overrides_with_path(path));

    assert_eq!(config.api_base, "https://env.test");
    assert_eq!(config.access_token.as_deref(), Some("t2"));

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    env::set_var(ENV_API_BASE, "https://env.test");

    let overrides = ConfigOverrides {
        api_base: Some("https://cli.test".to_string()),
        access_token: Some("cli-token".to_string()),
        config_path: Some(dir.path().join("missing.toml")),
        log_level: Some("warn".to_string()),
    };
    let config = ClientConfig::resolve(&overrides);

    assert_eq!(config.api_base, "https://cli.test");
    assert_eq!(config.access_token.as_deref(), Some("cli-token"));
    assert_eq!(config.log_level, "warn");

    clear_env();
}

#[test]
#[serial]
fn test_config_path_from_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "event_capacity = 7\n");
    env::set_var(ENV_CONFIG_PATH, &path);

    let config = ClientConfig::resolve(&ConfigOverrides::default());
    assert_eq!(config.event_capacity, 7);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_toml_degrades_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "api_base = [not toml");

    assert!(load_toml_config(&path).is_err());

    let config = ClientConfig::resolve(&overrides_with_path(path));
    assert_eq!(config.api_base, CompiledDefaults::default().api_base);
}

#[test]
#[serial]
fn test_zero_event_capacity_falls_back() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "event_capacity = 0\n");

    let config = ClientConfig::resolve(&overrides_with_path(path));
    assert_eq!(config.event_capacity, 100);
}
