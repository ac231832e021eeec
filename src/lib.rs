// steam-proxy - JSON-RPC proxy for Steam leaderboard and Workshop queries
//
// This is the library crate containing the query orchestration, the native callback loop
// and the JSON-RPC surface. The binary crate (main.rs) wires them into a TCP service.

pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod native;
pub mod rpc;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::ProxyConfig;
pub use native::{NativeClient, PlatformSnapshot, SnapshotClient, StartupError};
pub use rpc::{ProxyClient, ProxyService, RpcServer};
pub use services::{NativeSession, SessionHandle};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
