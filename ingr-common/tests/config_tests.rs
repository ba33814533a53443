//! Tests for configuration resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate the server's environment variables are marked with
//! #[serial] to ensure they run sequentially, not in parallel.

use ingr_common::config::{
    load_toml_config, CliOverrides, CompiledDefaults, ServerConfig, TomlConfig, ENV_DATABASE_URL,
    ENV_HOST, ENV_PLUGINS_DIR, ENV_PORT, ENV_TMP_FOLDER, ENV_UPLOAD_DIR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

fn clear_env() {
    for name in [
        ENV_HOST,
        ENV_PORT,
        ENV_DATABASE_URL,
        ENV_UPLOAD_DIR,
        ENV_TMP_FOLDER,
        ENV_PLUGINS_DIR,
    ] {
        env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_defaults_when_nothing_configured() {
    clear_env();

    let config = ServerConfig::resolve(&CliOverrides::default(), &TomlConfig::default()).unwrap();
    let defaults = CompiledDefaults::default();

    assert_eq!(config.host, defaults.host);
    assert_eq!(config.port, 8000);
    assert_eq!(config.upload_dir, PathBuf::from("./static"));
    assert_eq!(config.tmp_dir, PathBuf::from("./.tmp"));
    assert_eq!(config.database_path, PathBuf::from("./static").join("local.db"));
    assert_eq!(config.plugin_executor, vec!["python3", "plugin_executor.py"]);
    assert_eq!(config.log_level, "info");
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    env::set_var(ENV_UPLOAD_DIR, "/tmp/ingr-env-uploads");
    env::set_var(ENV_PORT, "9001");

    let toml = TomlConfig {
        upload_dir: Some(PathBuf::from("/tmp/ingr-toml-uploads")),
        port: Some(7000),
        tmp_dir: Some(PathBuf::from("/tmp/ingr-toml-tmp")),
        ..Default::default()
    };

    let config = ServerConfig::resolve(&CliOverrides::default(), &toml).unwrap();

    assert_eq!(config.upload_dir, PathBuf::from("/tmp/ingr-env-uploads"));
    assert_eq!(config.port, 9001);
    // Not set in ENV: falls through to TOML
    assert_eq!(config.tmp_dir, PathBuf::from("/tmp/ingr-toml-tmp"));

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    env::set_var(ENV_HOST, "10.0.0.1");
    env::set_var(ENV_DATABASE_URL, "sqlite://./env.db");

    let cli = CliOverrides {
        host: Some("127.0.0.1".to_string()),
        database: Some("/tmp/cli.db".to_string()),
        ..Default::default()
    };

    let config = ServerConfig::resolve(&cli, &TomlConfig::default()).unwrap();

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.database_path, PathBuf::from("/tmp/cli.db"));

    clear_env();
}

#[test]
#[serial]
fn test_database_url_env_strips_scheme() {
    clear_env();
    env::set_var(ENV_DATABASE_URL, "sqlite://./static/local.db");

    let config = ServerConfig::resolve(&CliOverrides::default(), &TomlConfig::default()).unwrap();
    assert_eq!(config.database_path, PathBuf::from("./static/local.db"));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_port_env_is_config_error() {
    clear_env();
    env::set_var(ENV_PORT, "not-a-port");

    let result = ServerConfig::resolve(&CliOverrides::default(), &TomlConfig::default());
    assert!(result.is_err());

    clear_env();
}

#[test]
#[serial]
fn test_empty_plugin_executor_rejected() {
    let toml = TomlConfig {
        plugin_executor: Some(Vec::new()),
        ..Default::default()
    };
    let result = ServerConfig::resolve(&CliOverrides::default(), &toml);
    assert!(result.is_err());
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = load_toml_config(Some(&temp_dir.path().join("absent.toml"))).unwrap();
    assert!(config.port.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_config_file_is_loaded() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        host = "127.0.0.1"
        plugin_executor = ["python3", "/opt/plugins/executor.py"]

        [logging]
        level = "warn"
        "#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.host.as_deref(), Some("127.0.0.1"));
    assert_eq!(config.plugin_executor.unwrap()[1], "/opt/plugins/executor.py");
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_malformed_config_file_is_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "port = \"eighty\"").unwrap();

    assert!(load_toml_config(Some(&path)).is_err());
}
