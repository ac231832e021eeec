//! A [`NativeClient`] that serves a recorded platform snapshot.
//!
//! The snapshot is a YAML document of leaderboards, Workshop items and persona names.
//! Asynchronous calls complete on the *next* [`run_callbacks`](NativeClient::run_callbacks),
//! like the real client, and Workshop results are paged [`UGC_RESULTS_PER_PAGE`] at a time.
//! Failures can be injected per call kind for testing error paths.

use super::{NativeClient, StartupError};
use crate::models::steam::{
    AppId, CallHandle, Completion, DownloadedEntries, EntriesHandle, IoFailure,
    LeaderboardDataRequest, LeaderboardEntry, LeaderboardHandle, SteamId, UgcDetails, UgcQuery,
    UgcQueryHandle, UgcQueryOrder, UgcQueryPage,
};
use anyhow::{Context, Result};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;

/// Native page size of Workshop queries
pub const UGC_RESULTS_PER_PAGE: u32 = 50;

/// Recorded platform state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSnapshot {
    /// Application whose Workshop the items belong to
    pub app_id: Option<u32>,

    /// Leaderboards by name; rows in rank order
    pub leaderboards: IndexMap<String, Vec<SnapshotEntry>>,

    /// Workshop items in any order
    pub workshop: Vec<SnapshotItem>,

    pub personas: HashMap<u64, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub steam_id: u64,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotItem {
    #[serde(flatten)]
    pub details: UgcDetails,
    #[serde(default)]
    pub preview_url: String,
}

impl PlatformSnapshot {
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read platform snapshot: {}", path))?;

        let snapshot: PlatformSnapshot = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Failed to parse platform snapshot: {}", path))?;

        tracing::info!(
            "Loaded platform snapshot from {} ({} leaderboards, {} workshop items)",
            path,
            snapshot.leaderboards.len(),
            snapshot.workshop.len()
        );
        Ok(snapshot)
    }
}

/// Native call kinds that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// `find_leaderboard` completes with its I/O failure flag set
    FindLeaderboard,
    /// Leaderboard downloads complete with their I/O failure flag set
    DownloadEntries,
    /// `downloaded_leaderboard_entry` returns `None`
    ReadEntry,
    /// Workshop queries complete with their I/O failure flag set
    UgcQuery,
    /// `ugc_query_result` returns `None`
    ReadUgcResult,
}

struct ReadyDownload {
    rows: Vec<LeaderboardEntry>,
}

struct ReadyPage {
    items: Vec<SnapshotItem>,
}

pub struct SnapshotClient {
    snapshot: PlatformSnapshot,
    initialized: bool,
    next_id: u64,
    pending: VecDeque<(CallHandle, Completion)>,
    downloads: HashMap<EntriesHandle, ReadyDownload>,
    pages: HashMap<UgcQueryHandle, ReadyPage>,
    failures: HashSet<FailurePoint>,
    startup_failure: Option<StartupError>,
    ugc_queries_sent: usize,
}

impl SnapshotClient {
    pub fn new(snapshot: PlatformSnapshot) -> Self {
        Self {
            snapshot,
            initialized: false,
            next_id: 0,
            pending: VecDeque::new(),
            downloads: HashMap::new(),
            pages: HashMap::new(),
            failures: HashSet::new(),
            startup_failure: None,
            ugc_queries_sent: 0,
        }
    }

    /// Make every call of the given kind fail
    pub fn fail_on(mut self, point: FailurePoint) -> Self {
        self.failures.insert(point);
        self
    }

    /// Make `init` fail with the given error
    pub fn fail_startup(mut self, error: StartupError) -> Self {
        self.startup_failure = Some(error);
        self
    }

    /// Number of Workshop pages requested so far
    pub fn ugc_queries_sent(&self) -> usize {
        self.ugc_queries_sent
    }

    pub fn open_query_handles(&self) -> usize {
        self.pages.len()
    }

    pub fn open_download_handles(&self) -> usize {
        self.downloads.len()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn queue(&mut self, completion: Completion) -> CallHandle {
        let handle = CallHandle(self.next_id());
        self.pending.push_back((handle, completion));
        handle
    }

    fn board_rows(&self, board: LeaderboardHandle) -> Option<&Vec<SnapshotEntry>> {
        self.snapshot
            .leaderboards
            .get_index(board.0 as usize)
            .map(|(_, rows)| rows)
    }

    fn ranked(rows: &[SnapshotEntry]) -> impl Iterator<Item = LeaderboardEntry> + '_ {
        rows.iter().enumerate().map(|(i, row)| LeaderboardEntry {
            steam_id: SteamId(row.steam_id),
            global_rank: i as i32 + 1,
            score: row.score,
        })
    }

    fn finish_download(&mut self, rows: Vec<LeaderboardEntry>) -> CallHandle {
        if self.failures.contains(&FailurePoint::DownloadEntries) {
            return self.queue(Completion::ScoresDownloaded(Err(IoFailure)));
        }

        let entries = EntriesHandle(self.next_id());
        let entry_count = rows.len() as i32;
        self.downloads.insert(entries, ReadyDownload { rows });
        self.queue(Completion::ScoresDownloaded(Ok(DownloadedEntries {
            entries,
            entry_count,
        })))
    }

    fn matches(query: &UgcQuery, app: Option<AppId>, item: &SnapshotItem) -> bool {
        if let Some(app) = app {
            if app != query.consumer_app {
                return false;
            }
        }

        let tags: Vec<&str> = item.details.tags.split(',').collect();
        let tagged = if query.required_tags.is_empty() {
            true
        } else if query.match_any_tag {
            query.required_tags.iter().any(|t| tags.contains(&t.as_str()))
        } else {
            query.required_tags.iter().all(|t| tags.contains(&t.as_str()))
        };

        let text_ok = match &query.search_text {
            Some(text) if !text.is_empty() => {
                let needle = text.to_lowercase();
                item.details.title.to_lowercase().contains(&needle)
                    || item.details.description.to_lowercase().contains(&needle)
            }
            _ => true,
        };

        tagged && text_ok
    }
}

impl NativeClient for SnapshotClient {
    fn init(&mut self) -> Result<(), StartupError> {
        if let Some(error) = self.startup_failure.take() {
            return Err(error);
        }
        self.initialized = true;
        tracing::debug!("Snapshot client initialized");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.initialized = false;
        self.pending.clear();
        self.downloads.clear();
        self.pages.clear();
        tracing::debug!("Snapshot client shut down");
    }

    fn find_leaderboard(&mut self, name: &str) -> CallHandle {
        if self.failures.contains(&FailurePoint::FindLeaderboard) {
            return self.queue(Completion::LeaderboardFound(Err(IoFailure)));
        }

        let board = self
            .snapshot
            .leaderboards
            .get_index_of(name)
            .map(|index| LeaderboardHandle(index as u64));
        self.queue(Completion::LeaderboardFound(Ok(board)))
    }

    fn leaderboard_entry_count(&self, board: LeaderboardHandle) -> i32 {
        self.board_rows(board).map_or(0, |rows| rows.len() as i32)
    }

    fn download_leaderboard_entries(
        &mut self,
        board: LeaderboardHandle,
        _request: LeaderboardDataRequest,
        start: i32,
        end: i32,
    ) -> CallHandle {
        let rows: Vec<LeaderboardEntry> = match self.board_rows(board) {
            Some(rows) => Self::ranked(rows)
                .filter(|e| e.global_rank >= start && e.global_rank <= end)
                .collect(),
            None => Vec::new(),
        };
        self.finish_download(rows)
    }

    fn download_leaderboard_entries_for_users(
        &mut self,
        board: LeaderboardHandle,
        users: &[SteamId],
    ) -> CallHandle {
        let rows: Vec<LeaderboardEntry> = match self.board_rows(board) {
            Some(rows) => Self::ranked(rows)
                .filter(|e| users.contains(&e.steam_id))
                .take(super::MAX_USERS_PER_DOWNLOAD)
                .collect(),
            None => Vec::new(),
        };
        self.finish_download(rows)
    }

    fn downloaded_leaderboard_entry(
        &self,
        entries: EntriesHandle,
        index: i32,
    ) -> Option<LeaderboardEntry> {
        if self.failures.contains(&FailurePoint::ReadEntry) || index < 0 {
            return None;
        }
        self.downloads
            .get(&entries)
            .and_then(|download| download.rows.get(index as usize))
            .cloned()
    }

    fn release_downloaded_entries(&mut self, entries: EntriesHandle) {
        self.downloads.remove(&entries);
    }

    fn send_ugc_query(&mut self, query: UgcQuery) -> CallHandle {
        self.ugc_queries_sent += 1;

        if self.failures.contains(&FailurePoint::UgcQuery) {
            return self.queue(Completion::UgcQueryCompleted(Err(IoFailure)));
        }

        let app = self.snapshot.app_id.map(AppId);
        let mut matching: Vec<SnapshotItem> = self
            .snapshot
            .workshop
            .iter()
            .filter(|item| Self::matches(&query, app, item))
            .cloned()
            .collect();

        match query.order {
            UgcQueryOrder::RankedByPublicationDate => matching.sort_by(|a, b| {
                b.details
                    .time_created
                    .cmp(&a.details.time_created)
                    .then(b.details.published_file_id.cmp(&a.details.published_file_id))
            }),
        }

        let total_matching_results = matching.len() as u32;
        let skip = query.page.saturating_sub(1).saturating_mul(UGC_RESULTS_PER_PAGE) as usize;
        let items: Vec<SnapshotItem> = matching
            .into_iter()
            .skip(skip)
            .take(UGC_RESULTS_PER_PAGE as usize)
            .collect();

        let handle = UgcQueryHandle(self.next_id());
        let results_returned = items.len() as u32;
        self.pages.insert(handle, ReadyPage { items });

        self.queue(Completion::UgcQueryCompleted(Ok(UgcQueryPage {
            handle,
            results_returned,
            total_matching_results,
        })))
    }

    fn ugc_query_result(&self, handle: UgcQueryHandle, index: u32) -> Option<UgcDetails> {
        if self.failures.contains(&FailurePoint::ReadUgcResult) {
            return None;
        }
        self.pages
            .get(&handle)
            .and_then(|page| page.items.get(index as usize))
            .map(|item| item.details.clone())
    }

    fn ugc_preview_url(&self, handle: UgcQueryHandle, index: u32) -> Option<String> {
        self.pages
            .get(&handle)
            .and_then(|page| page.items.get(index as usize))
            .map(|item| item.preview_url.clone())
    }

    fn release_ugc_query(&mut self, handle: UgcQueryHandle) {
        self.pages.remove(&handle);
    }

    fn persona_name(&self, user: SteamId) -> String {
        // Steam answers "[unknown]" for users it has no persona for
        self.snapshot
            .personas
            .get(&user.0)
            .cloned()
            .unwrap_or_else(|| "[unknown]".to_string())
    }

    fn run_callbacks(&mut self) -> Vec<(CallHandle, Completion)> {
        if !self.initialized {
            return Vec::new();
        }
        self.pending.drain(..).collect()
    }
}
