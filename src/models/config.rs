use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::steam::AppId;

/// Distance's Steam application id
pub const DEFAULT_APP_ID: u32 = 233610;

/// Proxy configuration from steam-proxy.yaml plus environment overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub server: ServerSettings,
    pub steam: SteamSettings,
    pub logging: LoggingSettings,
}

/// JSON-RPC listener settings. The port is always given on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,

    /// Connections served at the same time; 1 serves them strictly one after another
    pub max_connections: usize,

    /// Largest accepted frame body in bytes
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            max_connections: 1,
            max_message_size: 4 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteamSettings {
    pub app_id: u32,

    /// Workshop items must carry at least one of these tags
    pub required_tags: Vec<String>,

    pub poll_interval_ms: u64,

    /// Platform snapshot served by the snapshot backend
    pub snapshot: Option<Utf8PathBuf>,
}

impl Default for SteamSettings {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID,
            required_tags: vec![
                "Sprint".to_string(),
                "Challenge".to_string(),
                "Stunt".to_string(),
            ],
            poll_interval_ms: 10,
            snapshot: None,
        }
    }
}

impl SteamSettings {
    pub fn app_id(&self) -> AppId {
        AppId(self.app_id)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Utf8PathBuf,
    pub prefix: String,
    pub debug: bool,
    pub console: bool,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: Utf8PathBuf::from("logs"),
            prefix: "steam-proxy".to_string(),
            debug: false,
            console: true,
            json: false,
        }
    }
}
