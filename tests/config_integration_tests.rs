//! Integration tests for ConfigManager and configuration file handling
//!
//! These tests verify:
//! - Default configuration when no file exists
//! - Loading and saving steam-proxy.yaml
//! - Environment overrides layered over the file
//! - Invalid configuration handling

use camino::Utf8PathBuf;
use std::fs;
use steam_proxy::ConfigManager;
use steam_proxy::config::CONFIG_FILE_NAME;
use steam_proxy::models::ProxyConfig;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

fn overrides(pairs: &[(&str, &str)]) -> config::Map<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), config_path.as_path());
    assert_eq!(
        manager.config_path(),
        config_path.join(CONFIG_FILE_NAME).as_path()
    );
}

#[test]
fn test_config_dir_is_created() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("etc").join("steam-proxy");

    ConfigManager::new(&nested).unwrap();
    assert!(nested.exists());
}

#[test]
fn test_load_default_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let config = manager.load_config_with_overrides(overrides(&[])).unwrap();

    assert_eq!(config.steam.app_id, 233610);
    assert_eq!(config.steam.required_tags, vec!["Sprint", "Challenge", "Stunt"]);
    assert_eq!(config.server.max_connections, 1);
    assert!(config.steam.snapshot.is_none());
    assert!(!config.logging.debug);
}

#[test]
fn test_save_and_reload() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut config = ProxyConfig::default();
    config.server.bind_address = "127.0.0.1".to_string();
    config.server.max_connections = 8;
    config.steam.snapshot = Some(Utf8PathBuf::from("data/snapshot.yaml"));
    config.logging.json = true;

    manager.save_config(&config).unwrap();
    let reloaded = manager.load_config_with_overrides(overrides(&[])).unwrap();

    assert_eq!(reloaded, config);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(CONFIG_FILE_NAME),
        "steam:\n  poll_interval_ms: 25\nlogging:\n  debug: true\n",
    )
    .unwrap();
    let manager = ConfigManager::new(&config_path).unwrap();

    let config = manager.load_config_with_overrides(overrides(&[])).unwrap();

    assert_eq!(config.steam.poll_interval_ms, 25);
    assert_eq!(config.steam.app_id, 233610);
    assert!(config.logging.debug);
    assert_eq!(config.logging.prefix, "steam-proxy");
}

#[test]
fn test_environment_overrides_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(CONFIG_FILE_NAME),
        "server:\n  max_connections: 2\n",
    )
    .unwrap();
    let manager = ConfigManager::new(&config_path).unwrap();

    let config = manager
        .load_config_with_overrides(overrides(&[
            ("STEAM_PROXY_SERVER__MAX_CONNECTIONS", "6"),
            ("STEAM_PROXY_STEAM__REQUIRED_TAGS", "Sprint,Stunt"),
            ("STEAM_PROXY_STEAM__SNAPSHOT", "/srv/snapshot.yaml"),
            ("UNRELATED_VARIABLE", "ignored"),
        ]))
        .unwrap();

    assert_eq!(config.server.max_connections, 6);
    assert_eq!(config.steam.required_tags, vec!["Sprint", "Stunt"]);
    assert_eq!(
        config.steam.snapshot,
        Some(Utf8PathBuf::from("/srv/snapshot.yaml"))
    );
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert!(manager.write_default_config().unwrap());
    let contents = fs::read_to_string(manager.config_path()).unwrap();
    assert!(contents.contains("app_id: 233610"));

    let config = manager.load_config_with_overrides(overrides(&[])).unwrap();
    assert_eq!(config, ProxyConfig::default());
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(CONFIG_FILE_NAME),
        "server: [unterminated\n",
    )
    .unwrap();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert!(manager.load_config_with_overrides(overrides(&[])).is_err());
}

#[test]
fn test_wrong_type_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(CONFIG_FILE_NAME),
        "server:\n  max_connections: many\n",
    )
    .unwrap();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert!(manager.load_config_with_overrides(overrides(&[])).is_err());
}
