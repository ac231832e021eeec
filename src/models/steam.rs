use serde::{Deserialize, Serialize};
use std::fmt;

/// 64-bit Steam user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SteamId(pub u64);

impl From<u64> for SteamId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<SteamId> for u64 {
    fn from(id: SteamId) -> Self {
        id.0
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Steam application identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub u32);

/// Opaque token returned by an asynchronous native call.
///
/// The matching completion is delivered by [`NativeClient::run_callbacks`](crate::native::NativeClient::run_callbacks)
/// tagged with the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallHandle(pub u64);

/// Handle to a leaderboard located by `find_leaderboard`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaderboardHandle(pub u64);

/// Handle to a set of downloaded leaderboard entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntriesHandle(pub u64);

/// Handle to a completed Workshop (UGC) query page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UgcQueryHandle(pub u64);

/// Which slice of a leaderboard a ranged download covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardDataRequest {
    Global,
}

/// Sort order of a Workshop query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UgcQueryOrder {
    RankedByPublicationDate,
}

/// Kind of Workshop content a query matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingUgcType {
    ItemsReadyToUse,
}

/// One page of an "all UGC" query, fully described before it is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UgcQuery {
    pub order: UgcQueryOrder,
    pub matching: MatchingUgcType,
    pub creator_app: AppId,
    pub consumer_app: AppId,
    /// 1-based page number
    pub page: u32,
    pub required_tags: Vec<String>,
    /// When true an item matches if it carries any of `required_tags`
    pub match_any_tag: bool,
    pub search_text: Option<String>,
}

/// A single downloaded leaderboard row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub steam_id: SteamId,
    pub global_rank: i32,
    pub score: i32,
}

/// Result of a completed leaderboard download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadedEntries {
    pub entries: EntriesHandle,
    pub entry_count: i32,
}

/// Result of a completed Workshop query page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UgcQueryPage {
    pub handle: UgcQueryHandle,
    pub results_returned: u32,
    pub total_matching_results: u32,
}

/// Metadata of a single Workshop item.
///
/// `tags` is the raw comma-separated tag string as the platform reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UgcDetails {
    pub published_file_id: u64,
    pub steam_id_owner: SteamId,
    pub file_name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub time_created: u32,
    pub time_updated: u32,
    pub file_size: i32,
    #[serde(default)]
    pub votes_up: u32,
    #[serde(default)]
    pub votes_down: u32,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub tags: String,
}

/// Marker for a native call that completed with its I/O failure flag set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoFailure;

/// Completion of an asynchronous native call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// `None` when no board with the requested name exists
    LeaderboardFound(Result<Option<LeaderboardHandle>, IoFailure>),
    ScoresDownloaded(Result<DownloadedEntries, IoFailure>),
    UgcQueryCompleted(Result<UgcQueryPage, IoFailure>),
}

impl Completion {
    /// Short name of the completion kind, for logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Completion::LeaderboardFound(_) => "LeaderboardFindResult",
            Completion::ScoresDownloaded(_) => "LeaderboardScoresDownloaded",
            Completion::UgcQueryCompleted(_) => "SteamUGCQueryCompleted",
        }
    }
}
