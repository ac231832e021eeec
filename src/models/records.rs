//! Serializable result records returned over JSON-RPC.
//!
//! Field names are part of the wire contract and must not be renamed.

use super::steam::{LeaderboardEntry, UgcDetails};
use serde::{Deserialize, Serialize};

/// Separator used by the platform in a Workshop item's raw tag string
pub const TAG_DELIMITER: char = ',';

/// One leaderboard row with its owner's resolved display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntryRecord {
    pub steam_id: u64,
    pub global_rank: i32,
    pub score: i32,
    pub player_name: String,
}

impl LeaderboardEntryRecord {
    pub fn new(entry: &LeaderboardEntry, player_name: String) -> Self {
        Self {
            steam_id: entry.steam_id.into(),
            global_rank: entry.global_rank,
            score: entry.score,
            player_name,
        }
    }
}

/// Result of `GetLeaderboardRange` / `GetLeaderboardPlayers`.
///
/// `total_entries` is the size of the whole board, not of `entries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntryRecord>,
    pub total_entries: i32,
}

/// One Workshop level as returned by `GetWorkshopLevels`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopLevelRecord {
    pub published_file_id: u64,
    pub steam_id_owner: u64,
    pub file_name: String,
    pub title: String,
    pub description: String,
    pub time_created: u32,
    pub time_updated: u32,
    pub file_size: i32,
    pub votes_up: u32,
    pub votes_down: u32,
    pub score: f32,
    pub tags: Vec<String>,
    pub author_name: String,
    pub preview_url: String,
}

impl WorkshopLevelRecord {
    pub fn new(details: UgcDetails, author_name: String, preview_url: String) -> Self {
        let tags = split_tags(&details.tags);
        Self {
            published_file_id: details.published_file_id,
            steam_id_owner: details.steam_id_owner.into(),
            file_name: details.file_name,
            title: details.title,
            description: details.description,
            time_created: details.time_created,
            time_updated: details.time_updated,
            file_size: details.file_size,
            votes_up: details.votes_up,
            votes_down: details.votes_down,
            score: details.score,
            tags,
            author_name,
            preview_url,
        }
    }
}

/// Split a raw tag string on [`TAG_DELIMITER`], dropping empty pieces
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(TAG_DELIMITER)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
