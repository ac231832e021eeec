use super::{Progress, QueryError};
use crate::models::steam::{
    Completion, DownloadedEntries, IoFailure, LeaderboardDataRequest, LeaderboardEntry,
    LeaderboardHandle, SteamId,
};
use crate::native::{MAX_USERS_PER_DOWNLOAD, NativeClient};
use tokio::sync::oneshot;

/// Which rows of a leaderboard to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardSelector {
    /// Global ranks `start..=end`, 1-based
    Range { start: i32, end: i32 },

    /// Rows of these users. The native client accepts at most
    /// [`MAX_USERS_PER_DOWNLOAD`] users per call; larger lists are passed through as-is.
    Users(Vec<SteamId>),
}

/// A downloaded row with its owner's display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub entry: LeaderboardEntry,
    pub player_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardResult {
    pub entries: Vec<RankedEntry>,

    /// Size of the whole board, independent of how many rows were fetched
    pub total_entries: i32,
}

pub type LeaderboardReply = oneshot::Sender<Result<LeaderboardResult, QueryError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    FindingBoard,
    DownloadingEntries { total_entries: i32 },
}

impl Stage {
    fn expects(&self) -> &'static str {
        match self {
            Stage::FindingBoard => "LeaderboardFindResult",
            Stage::DownloadingEntries { .. } => "LeaderboardScoresDownloaded",
        }
    }
}

/// Find-then-download state machine for one leaderboard request
#[derive(Debug)]
pub struct LeaderboardQuery {
    name: String,
    selector: LeaderboardSelector,
    stage: Stage,
    reply: LeaderboardReply,
}

impl LeaderboardQuery {
    /// Issue the "find leaderboard" call
    pub fn start(
        client: &mut dyn NativeClient,
        name: String,
        selector: LeaderboardSelector,
        reply: LeaderboardReply,
    ) -> Progress<Self> {
        if let LeaderboardSelector::Users(users) = &selector {
            if users.len() > MAX_USERS_PER_DOWNLOAD {
                tracing::warn!(
                    "Leaderboard '{}' requested for {} users, native limit is {} per call",
                    name,
                    users.len(),
                    MAX_USERS_PER_DOWNLOAD
                );
            }
        }

        let handle = client.find_leaderboard(&name);
        tracing::debug!("Finding leaderboard '{}' ({:?})", name, handle);

        Progress::Waiting(
            handle,
            Self {
                name,
                selector,
                stage: Stage::FindingBoard,
                reply,
            },
        )
    }

    /// Advance on the completion of the call this query is waiting for
    pub fn on_completion(
        self,
        client: &mut dyn NativeClient,
        completion: Completion,
    ) -> Progress<Self> {
        match (self.stage, completion) {
            (Stage::FindingBoard, Completion::LeaderboardFound(found)) => {
                self.on_board_found(client, found)
            }
            (Stage::DownloadingEntries { total_entries }, Completion::ScoresDownloaded(result)) => {
                self.on_scores_downloaded(client, total_entries, result)
            }
            (stage, other) => {
                let error = QueryError::UnexpectedCompletion {
                    expected: stage.expects(),
                    actual: other.kind(),
                };
                self.fail(error)
            }
        }
    }

    fn on_board_found(
        mut self,
        client: &mut dyn NativeClient,
        found: Result<Option<LeaderboardHandle>, IoFailure>,
    ) -> Progress<Self> {
        let board = match found {
            Err(IoFailure) => return self.fail(QueryError::Transport),
            Ok(None) => {
                tracing::debug!("Leaderboard '{}' not found", self.name);
                return self.resolve(LeaderboardResult::default());
            }
            Ok(Some(board)) => board,
        };

        let total_entries = client.leaderboard_entry_count(board);
        let handle = match &self.selector {
            LeaderboardSelector::Range { start, end } => client.download_leaderboard_entries(
                board,
                LeaderboardDataRequest::Global,
                *start,
                *end,
            ),
            LeaderboardSelector::Users(users) => {
                client.download_leaderboard_entries_for_users(board, users)
            }
        };

        self.stage = Stage::DownloadingEntries { total_entries };
        Progress::Waiting(handle, self)
    }

    fn on_scores_downloaded(
        self,
        client: &mut dyn NativeClient,
        total_entries: i32,
        result: Result<DownloadedEntries, IoFailure>,
    ) -> Progress<Self> {
        let downloaded = match result {
            Ok(downloaded) => downloaded,
            Err(IoFailure) => return self.fail(QueryError::Transport),
        };

        let count = match &self.selector {
            LeaderboardSelector::Range { start, end } => {
                let width = end.saturating_sub(*start).saturating_add(1).max(0);
                downloaded.entry_count.min(width)
            }
            LeaderboardSelector::Users(_) => downloaded.entry_count,
        };

        let mut entries = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            let Some(entry) = client.downloaded_leaderboard_entry(downloaded.entries, index) else {
                client.release_downloaded_entries(downloaded.entries);
                let message = format!(
                    "Error retrieving leaderboard entry {} of '{}'",
                    index, self.name
                );
                return self.fail(QueryError::DataRetrieval(message));
            };

            let player_name = client.persona_name(entry.steam_id);
            entries.push(RankedEntry { entry, player_name });
        }
        client.release_downloaded_entries(downloaded.entries);

        self.resolve(LeaderboardResult {
            entries,
            total_entries,
        })
    }

    fn resolve(self, result: LeaderboardResult) -> Progress<Self> {
        tracing::debug!(
            "Leaderboard '{}' resolved with {} of {} entries",
            self.name,
            result.entries.len(),
            result.total_entries
        );
        // The caller may have gone away; nothing to do then
        let _ = self.reply.send(Ok(result));
        Progress::Resolved
    }

    fn fail(self, error: QueryError) -> Progress<Self> {
        tracing::warn!("Leaderboard query '{}' failed: {}", self.name, error);
        let _ = self.reply.send(Err(error));
        Progress::Resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::snapshot::{FailurePoint, PlatformSnapshot, SnapshotClient, SnapshotEntry};
    use indexmap::IndexMap;

    fn client(rows: usize) -> SnapshotClient {
        let mut leaderboards = IndexMap::new();
        leaderboards.insert(
            "Cataclysm_1_stable".to_string(),
            (0..rows)
                .map(|i| SnapshotEntry {
                    steam_id: 100 + i as u64,
                    score: 1000 * (i as i32 + 1),
                })
                .collect(),
        );
        let mut client = SnapshotClient::new(PlatformSnapshot {
            leaderboards,
            ..Default::default()
        });
        client.init().unwrap();
        client
    }

    /// Pump callbacks until the query resolves
    fn drive(
        client: &mut SnapshotClient,
        mut progress: Progress<LeaderboardQuery>,
    ) -> usize {
        let mut steps = 0;
        while let Progress::Waiting(handle, query) = progress {
            let mut ready = client.run_callbacks();
            assert_eq!(ready.len(), 1);
            let (completed, completion) = ready.remove(0);
            assert_eq!(completed, handle);
            progress = query.on_completion(client, completion);
            steps += 1;
        }
        steps
    }

    fn run(
        client: &mut SnapshotClient,
        name: &str,
        selector: LeaderboardSelector,
    ) -> Result<LeaderboardResult, QueryError> {
        let (reply, mut rx) = oneshot::channel();
        let progress = LeaderboardQuery::start(client, name.to_string(), selector, reply);
        drive(client, progress);
        rx.try_recv().unwrap()
    }

    #[test]
    fn test_range_within_board() {
        let mut client = client(10);
        let result = run(
            &mut client,
            "Cataclysm_1_stable",
            LeaderboardSelector::Range { start: 1, end: 5 },
        )
        .unwrap();

        assert_eq!(result.entries.len(), 5);
        assert_eq!(result.total_entries, 10);
        assert_eq!(result.entries[0].entry.global_rank, 1);
        assert_eq!(result.entries[4].entry.global_rank, 5);
        assert_eq!(result.entries[0].player_name, "[unknown]");
        assert_eq!(client.open_download_handles(), 0);
    }

    #[test]
    fn test_repeated_queries_release_downloads() {
        let mut client = client(1);
        for _ in 0..1000 {
            run(
                &mut client,
                "Cataclysm_1_stable",
                LeaderboardSelector::Range { start: 1, end: 1 },
            )
            .unwrap();
        }
        assert_eq!(client.open_download_handles(), 0);
    }

    #[test]
    fn test_range_past_end_of_board() {
        let mut client = client(3);
        let result = run(
            &mut client,
            "Cataclysm_1_stable",
            LeaderboardSelector::Range { start: 1, end: 100 },
        )
        .unwrap();

        assert_eq!(result.entries.len(), 3);
        assert_eq!(result.total_entries, 3);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let mut client = client(3);
        let result = run(
            &mut client,
            "Cataclysm_1_stable",
            LeaderboardSelector::Range { start: 3, end: 1 },
        )
        .unwrap();

        assert!(result.entries.is_empty());
        assert_eq!(result.total_entries, 3);
    }

    #[test]
    fn test_user_list() {
        let mut client = client(10);
        let result = run(
            &mut client,
            "Cataclysm_1_stable",
            LeaderboardSelector::Users(vec![SteamId(102), SteamId(107), SteamId(999)]),
        )
        .unwrap();

        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].entry.steam_id, SteamId(102));
        assert_eq!(result.entries[1].entry.global_rank, 8);
        assert_eq!(result.total_entries, 10);
    }

    #[test]
    fn test_missing_board_resolves_empty() {
        let mut client = client(10);
        let (reply, mut rx) = oneshot::channel();
        let progress = LeaderboardQuery::start(
            &mut client,
            "Nonexistent".to_string(),
            LeaderboardSelector::Range { start: 1, end: 10 },
            reply,
        );

        // Only the find step runs
        assert_eq!(drive(&mut client, progress), 1);
        assert_eq!(rx.try_recv().unwrap(), Ok(LeaderboardResult::default()));
    }

    #[test]
    fn test_io_failure_on_find() {
        let mut client = client(10).fail_on(FailurePoint::FindLeaderboard);
        let result = run(
            &mut client,
            "Cataclysm_1_stable",
            LeaderboardSelector::Range { start: 1, end: 5 },
        );
        assert_eq!(result, Err(QueryError::Transport));
    }

    #[test]
    fn test_io_failure_on_download() {
        let mut client = client(10).fail_on(FailurePoint::DownloadEntries);
        let result = run(
            &mut client,
            "Cataclysm_1_stable",
            LeaderboardSelector::Users(vec![SteamId(100)]),
        );
        assert_eq!(result, Err(QueryError::Transport));
    }

    #[test]
    fn test_entry_read_failure_returns_no_partial_result() {
        let mut client = client(10).fail_on(FailurePoint::ReadEntry);
        let result = run(
            &mut client,
            "Cataclysm_1_stable",
            LeaderboardSelector::Range { start: 1, end: 5 },
        );
        assert!(matches!(result, Err(QueryError::DataRetrieval(_))));
        assert_eq!(client.open_download_handles(), 0);
    }

    #[test]
    fn test_unexpected_completion_fails_query() {
        let mut client = client(1);
        let (reply, mut rx) = oneshot::channel();
        let progress = LeaderboardQuery::start(
            &mut client,
            "Cataclysm_1_stable".to_string(),
            LeaderboardSelector::Range { start: 1, end: 1 },
            reply,
        );
        let Progress::Waiting(_, query) = progress else {
            panic!("query resolved before any completion");
        };

        let progress =
            query.on_completion(&mut client, Completion::UgcQueryCompleted(Err(IoFailure)));
        assert!(matches!(progress, Progress::Resolved));
        assert_eq!(
            rx.try_recv().unwrap(),
            Err(QueryError::UnexpectedCompletion {
                expected: "LeaderboardFindResult",
                actual: "SteamUGCQueryCompleted",
            })
        );
    }
}
