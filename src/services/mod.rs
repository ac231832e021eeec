//! Services module - query orchestration against the native Steam client.
//!
//! Every logical request the proxy serves becomes one small state machine that issues
//! asynchronous native calls and advances when their completions arrive:
//!
//! - [`LeaderboardQuery`]: find the board, then download a rank range or a user list
//! - [`WorkshopQuery`]: page through the Workshop until enough levels are collected
//!
//! All state machines live on the polling thread owned by [`NativeSession`]. Callers talk
//! to them through a cloneable [`SessionHandle`] and await a single result per query.
//!
//! # Resolution
//!
//! A query resolves exactly once. Its reply channel is consumed by the resolving step,
//! so a state machine cannot report both success and failure, and a query that is dropped
//! unresolved (session teardown) surfaces to the caller as [`QueryError::SessionClosed`].

pub mod leaderboard;
pub mod session;
pub mod workshop;

use crate::models::steam::CallHandle;
use thiserror::Error;

pub use leaderboard::{LeaderboardQuery, LeaderboardResult, LeaderboardSelector, RankedEntry};
pub use session::{NativeSession, SessionHandle, SessionSettings};
pub use workshop::{CatalogEntry, CatalogScope, WorkshopQuery, WorkshopSearch};

/// Errors a query can fail with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("native call reported an I/O failure")]
    Transport,

    #[error("{0}")]
    DataRetrieval(String),

    #[error("expected {expected} completion, got {actual}")]
    UnexpectedCompletion {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("native session is not running")]
    SessionClosed,
}

/// Outcome of starting or advancing a query state machine
#[derive(Debug)]
pub enum Progress<Q> {
    /// The query issued another native call and waits for its completion
    Waiting(CallHandle, Q),

    /// The query delivered its result (or error) to the caller
    Resolved,
}
