use crate::models::ProxyConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "steam-proxy.yaml";

/// Prefix of environment overrides, e.g. `STEAM_PROXY_SERVER__MAX_CONNECTIONS=4`
pub const ENV_PREFIX: &str = "STEAM_PROXY";

/// Environment variable selecting the config directory
pub const CONFIG_DIR_VAR: &str = "STEAM_PROXY_CONFIG_DIR";

/// Where the file layer of a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(Utf8PathBuf),
    /// No config file; struct defaults (plus environment overrides) apply
    Defaults,
}

/// Configuration manager for the proxy's YAML configuration.
///
/// Settings are layered: struct defaults, then `steam-proxy.yaml` (optional), then
/// `STEAM_PROXY_*` environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager for the specified configuration directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
        })
    }

    /// ConfigManager for `$STEAM_PROXY_CONFIG_DIR`, or the working directory
    pub fn from_env() -> Result<Self> {
        let dir = std::env::var(CONFIG_DIR_VAR).unwrap_or_else(|_| ".".to_string());
        Self::new(dir)
    }

    /// Load the configuration, applying overrides from the process environment
    pub fn load_config(&self) -> Result<ProxyConfig> {
        self.build(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load the configuration with `overrides` standing in for the process environment.
    ///
    /// Keys are full variable names, e.g. `STEAM_PROXY_STEAM__APP_ID`.
    pub fn load_config_with_overrides(
        &self,
        overrides: config::Map<String, String>,
    ) -> Result<ProxyConfig> {
        self.build(Environment::with_prefix(ENV_PREFIX).source(Some(overrides)))
    }

    /// Whether loading reads the config file or falls back to defaults.
    ///
    /// Config is loaded before logging exists, so callers report this once a
    /// subscriber is installed.
    pub fn source(&self) -> ConfigSource {
        if self.config_path.exists() {
            ConfigSource::File(self.config_path.clone())
        } else {
            ConfigSource::Defaults
        }
    }

    fn build(&self, environment: Environment) -> Result<ProxyConfig> {
        let environment = environment
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("steam.required_tags");

        let config = Config::builder()
            .add_source(
                File::from(self.config_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to load config: {}", self.config_path))?;

        config
            .try_deserialize::<ProxyConfig>()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))
    }

    /// Save the configuration file.
    pub fn save_config(&self, config: &ProxyConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Write a default configuration file unless one exists.
    ///
    /// # Returns
    /// `true` if a file was created
    pub fn write_default_config(&self) -> Result<bool> {
        if self.config_path.exists() {
            return Ok(false);
        }
        self.save_config(&ProxyConfig::default())?;
        Ok(true)
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}
