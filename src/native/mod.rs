//! The native Steam client the proxy drives.
//!
//! [`NativeClient`] mirrors the callback-driven Steamworks surface: asynchronous calls
//! return a [`CallHandle`] immediately and their results arrive later from
//! [`NativeClient::run_callbacks`]. Synchronous accessors (entry counts, downloaded rows,
//! query results, persona names) answer in place.
//!
//! Implementations are only ever touched from the session's polling thread, so they
//! need `Send` but not `Sync`.

pub mod snapshot;

use crate::models::steam::{
    CallHandle, Completion, EntriesHandle, LeaderboardDataRequest, LeaderboardEntry,
    LeaderboardHandle, SteamId, UgcDetails, UgcQuery, UgcQueryHandle,
};
use thiserror::Error;

pub use snapshot::{PlatformSnapshot, SnapshotClient};

/// Largest user list `download_leaderboard_entries_for_users` accepts per call
pub const MAX_USERS_PER_DOWNLOAD: usize = 100;

/// Errors raised while bringing the native client up. All of them are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    #[error("native client version mismatch: {0}")]
    VersionMismatch(String),

    #[error("native library could not be loaded: {0}")]
    LibraryNotFound(String),

    #[error("native client initialization failed: {0}")]
    InitFailed(String),
}

pub trait NativeClient: Send + 'static {
    /// Bring the client up. Called exactly once, before any other method.
    fn init(&mut self) -> Result<(), StartupError>;

    /// Tear the client down. Called exactly once, after the last callback pump.
    fn shutdown(&mut self);

    fn find_leaderboard(&mut self, name: &str) -> CallHandle;

    fn leaderboard_entry_count(&self, board: LeaderboardHandle) -> i32;

    /// Download rows ranked `start..=end` (1-based)
    fn download_leaderboard_entries(
        &mut self,
        board: LeaderboardHandle,
        request: LeaderboardDataRequest,
        start: i32,
        end: i32,
    ) -> CallHandle;

    /// Download the rows of specific users; at most [`MAX_USERS_PER_DOWNLOAD`] per call
    fn download_leaderboard_entries_for_users(
        &mut self,
        board: LeaderboardHandle,
        users: &[SteamId],
    ) -> CallHandle;

    /// `None` when the row could not be read
    fn downloaded_leaderboard_entry(
        &self,
        entries: EntriesHandle,
        index: i32,
    ) -> Option<LeaderboardEntry>;

    /// Free the rows of a finished download
    fn release_downloaded_entries(&mut self, entries: EntriesHandle);

    fn send_ugc_query(&mut self, query: UgcQuery) -> CallHandle;

    fn ugc_query_result(&self, handle: UgcQueryHandle, index: u32) -> Option<UgcDetails>;

    fn ugc_preview_url(&self, handle: UgcQueryHandle, index: u32) -> Option<String>;

    fn release_ugc_query(&mut self, handle: UgcQueryHandle);

    fn persona_name(&self, user: SteamId) -> String;

    /// Drain every completion that became ready since the previous pump
    fn run_callbacks(&mut self) -> Vec<(CallHandle, Completion)>;
}
