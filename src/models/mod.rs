//! Data models for the Steam proxy.
//!
//! - [`ProxyConfig`]: listener, Steam and logging settings loaded by [`ConfigManager`](crate::config::ConfigManager)
//! - [`steam`]: native identifiers, call handles and completion payloads exchanged with a
//!   [`NativeClient`](crate::native::NativeClient)
//! - [`records`]: the plain serializable records returned to JSON-RPC callers

pub mod config;
pub mod records;
pub mod steam;

pub use config::{LoggingSettings, ProxyConfig, ServerSettings, SteamSettings};
pub use records::{LeaderboardEntryRecord, LeaderboardResponse, WorkshopLevelRecord};
pub use steam::{AppId, CallHandle, Completion, IoFailure, SteamId};
