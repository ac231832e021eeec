//! Property tests for the leaderboard and Workshop query state machines
//!
//! The state machines are driven directly against a snapshot client, without the
//! polling thread, so each case runs synchronously.

use indexmap::IndexMap;
use proptest::prelude::*;
use std::collections::HashMap;
use steam_proxy::NativeClient;
use steam_proxy::models::steam::{AppId, Completion, SteamId, UgcDetails};
use steam_proxy::native::snapshot::{SnapshotEntry, SnapshotItem};
use steam_proxy::services::{
    CatalogEntry, CatalogScope, LeaderboardQuery, LeaderboardResult, LeaderboardSelector,
    Progress, QueryError, WorkshopQuery, WorkshopSearch,
};
use steam_proxy::{PlatformSnapshot, SnapshotClient};
use tokio::sync::oneshot;

const BOARD: &str = "Inferno_1_stable";
const FIRST_ID: u64 = 76561198000000000;

fn board_snapshot(rows: usize) -> PlatformSnapshot {
    let mut leaderboards = IndexMap::new();
    leaderboards.insert(
        BOARD.to_string(),
        (0..rows)
            .map(|i| SnapshotEntry {
                steam_id: FIRST_ID + i as u64,
                score: 1000 + i as i32,
            })
            .collect(),
    );
    PlatformSnapshot {
        leaderboards,
        ..Default::default()
    }
}

fn catalog_snapshot(created: &[u32]) -> PlatformSnapshot {
    let workshop = created
        .iter()
        .enumerate()
        .map(|(i, &time_created)| SnapshotItem {
            details: UgcDetails {
                published_file_id: 1 + i as u64,
                steam_id_owner: SteamId(FIRST_ID),
                file_name: format!("{}.bytes", i),
                title: format!("Level {}", i),
                description: String::new(),
                time_created,
                time_updated: time_created,
                file_size: 1,
                votes_up: 0,
                votes_down: 0,
                score: 0.0,
                tags: "Sprint".to_string(),
            },
            preview_url: String::new(),
        })
        .collect();
    PlatformSnapshot {
        workshop,
        personas: HashMap::new(),
        ..Default::default()
    }
}

fn started(snapshot: PlatformSnapshot) -> SnapshotClient {
    let mut client = SnapshotClient::new(snapshot);
    client.init().unwrap();
    client
}

/// Pump callbacks until the query resolves, feeding it the completion it waits for
fn drive<Q>(
    client: &mut SnapshotClient,
    mut progress: Progress<Q>,
    advance: fn(Q, &mut dyn NativeClient, Completion) -> Progress<Q>,
) {
    loop {
        let (handle, query) = match progress {
            Progress::Resolved => return,
            Progress::Waiting(handle, query) => (handle, query),
        };
        let completion = client
            .run_callbacks()
            .into_iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, completion)| completion)
            .expect("no completion for the pending call");
        progress = advance(query, client, completion);
    }
}

fn leaderboard(
    client: &mut SnapshotClient,
    selector: LeaderboardSelector,
) -> Result<LeaderboardResult, QueryError> {
    let (reply, mut rx) = oneshot::channel();
    let progress = LeaderboardQuery::start(client, BOARD.to_string(), selector, reply);
    drive(client, progress, LeaderboardQuery::on_completion);
    rx.try_recv().unwrap()
}

fn workshop(client: &mut SnapshotClient, max_results: u32) -> Vec<CatalogEntry> {
    let scope = CatalogScope {
        app_id: AppId(233610),
        required_tags: vec!["Sprint".to_string()],
    };
    let search = WorkshopSearch {
        max_results,
        search_text: None,
    };
    let (reply, mut rx) = oneshot::channel();
    let progress = WorkshopQuery::start(client, scope, search, reply);
    drive(client, progress, WorkshopQuery::on_completion);
    rx.try_recv().unwrap().unwrap()
}

proptest! {
    /// A range inside the board returns exactly `end - start + 1` rows
    #[test]
    fn range_within_board_is_exact((total, start, end) in (1usize..300).prop_flat_map(|total| {
        (Just(total), 1..=total as i32)
    }).prop_flat_map(|(total, start)| (Just(total), Just(start), start..=total as i32))) {
        let mut client = started(board_snapshot(total));
        let result = leaderboard(&mut client, LeaderboardSelector::Range { start, end }).unwrap();

        prop_assert_eq!(result.entries.len() as i32, end - start + 1);
        prop_assert_eq!(result.total_entries, total as i32);
        prop_assert_eq!(result.entries[0].entry.global_rank, start);
    }

    /// A range past the end of the board returns what exists and the real total
    #[test]
    fn range_past_board_truncates(total in 0usize..100, extra in 1i32..100) {
        let mut client = started(board_snapshot(total));
        let end = total as i32 + extra;
        let result =
            leaderboard(&mut client, LeaderboardSelector::Range { start: 1, end }).unwrap();

        prop_assert_eq!(result.entries.len(), total);
        prop_assert_eq!(result.total_entries, total as i32);
    }

    /// User lists never return more rows than ids, exactly as many when all are ranked
    #[test]
    fn user_list_count_bounded(
        total in 1usize..200,
        picks in prop::collection::hash_set(0u64..400, 0..100),
    ) {
        let mut client = started(board_snapshot(total));
        let users: Vec<SteamId> = picks.iter().map(|i| SteamId(FIRST_ID + i)).collect();
        let ranked = picks.iter().filter(|&&i| i < total as u64).count();

        let result = leaderboard(&mut client, LeaderboardSelector::Users(users.clone())).unwrap();

        prop_assert!(result.entries.len() <= users.len());
        prop_assert_eq!(result.entries.len(), ranked);
    }

    /// Asking for 2N levels returns the N-level answer as a prefix
    #[test]
    fn workshop_results_are_prefix_stable(
        created in prop::collection::vec(1_500_000_000u32..1_700_000_000, 0..180),
        n in 1u32..90,
    ) {
        let mut client = started(catalog_snapshot(&created));
        let first = workshop(&mut client, n);
        let second = workshop(&mut client, 2 * n);

        prop_assert_eq!(first.len(), (n as usize).min(created.len()));
        prop_assert_eq!(second.len(), (2 * n as usize).min(created.len()));
        prop_assert_eq!(&second[..first.len()], &first[..]);
        prop_assert_eq!(client.open_query_handles(), 0);
    }
}

#[test]
fn test_zero_results_sends_no_page_request() {
    let mut client = started(catalog_snapshot(&[1, 2, 3]));
    assert!(workshop(&mut client, 0).is_empty());
    assert_eq!(client.ugc_queries_sent(), 0);
}
