//! The process-wide native session and its callback polling loop.
//!
//! [`NativeSession::start`] initializes the native client and moves it onto a dedicated
//! polling thread. That thread is the only place the client is ever touched: it starts
//! queries sent through a [`SessionHandle`], pumps [`NativeClient::run_callbacks`] at a
//! fixed interval and routes each completion to the query waiting on its call handle.
//! Because every state transition runs on that one thread, query state needs no locks.
//!
//! Dropping or shutting down the session stops the loop, drops unresolved queries (their
//! callers see [`QueryError::SessionClosed`]) and tears the client down.

use super::leaderboard::{
    LeaderboardQuery, LeaderboardReply, LeaderboardResult, LeaderboardSelector,
};
use super::workshop::{CatalogEntry, CatalogScope, WorkshopQuery, WorkshopReply, WorkshopSearch};
use super::{Progress, QueryError};
use crate::metrics::Metrics;
use crate::models::SteamSettings;
use crate::models::steam::{CallHandle, Completion, SteamId};
use crate::native::{NativeClient, StartupError};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Settings the polling loop needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    pub scope: CatalogScope,
}

impl From<&SteamSettings> for SessionSettings {
    fn from(settings: &SteamSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            scope: CatalogScope {
                app_id: settings.app_id(),
                required_tags: settings.required_tags.clone(),
            },
        }
    }
}

/// Work handed to the polling thread
#[derive(Debug)]
enum Command {
    Leaderboard {
        name: String,
        selector: LeaderboardSelector,
        reply: LeaderboardReply,
    },
    Workshop {
        search: WorkshopSearch,
        reply: WorkshopReply,
    },
    PersonaName {
        user: SteamId,
        reply: oneshot::Sender<String>,
    },
}

/// A query waiting for the completion of one native call
#[derive(Debug)]
enum PendingQuery {
    Leaderboard(LeaderboardQuery),
    Workshop(WorkshopQuery),
}

struct Poller<C> {
    client: C,
    pending: HashMap<CallHandle, PendingQuery>,
    commands: mpsc::UnboundedReceiver<Command>,
    settings: SessionSettings,
    stop: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
}

impl<C: NativeClient> Poller<C> {
    fn run(mut self) {
        tracing::info!(
            "Native callback loop started (interval {:?})",
            self.settings.poll_interval
        );

        loop {
            let disconnected = self.accept_commands();
            self.dispatch_completions();

            if disconnected || self.stop.load(Ordering::Acquire) {
                break;
            }
            thread::sleep(self.settings.poll_interval);
        }

        self.commands.close();
        while self.commands.try_recv().is_ok() {}

        if !self.pending.is_empty() {
            tracing::warn!(
                "Dropping {} unresolved native queries at shutdown",
                self.pending.len()
            );
        }
        self.pending.clear();
        self.client.shutdown();
        tracing::info!("Native callback loop stopped");
    }

    /// Start every queued command; returns true once all handles are gone
    fn accept_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.start(command),
                Err(mpsc::error::TryRecvError::Empty) => return false,
                Err(mpsc::error::TryRecvError::Disconnected) => return true,
            }
        }
    }

    fn start(&mut self, command: Command) {
        match command {
            Command::Leaderboard {
                name,
                selector,
                reply,
            } => {
                let progress = LeaderboardQuery::start(&mut self.client, name, selector, reply);
                self.track(progress, PendingQuery::Leaderboard);
            }
            Command::Workshop { search, reply } => {
                let scope = self.settings.scope.clone();
                let progress = WorkshopQuery::start(&mut self.client, scope, search, reply);
                self.track(progress, PendingQuery::Workshop);
            }
            Command::PersonaName { user, reply } => {
                let _ = reply.send(self.client.persona_name(user));
            }
        }
    }

    fn track<Q>(&mut self, progress: Progress<Q>, wrap: fn(Q) -> PendingQuery) {
        if let Progress::Waiting(handle, query) = progress {
            self.pending.insert(handle, wrap(query));
        }
    }

    fn dispatch_completions(&mut self) {
        for (handle, completion) in self.client.run_callbacks() {
            self.metrics.record_completion_dispatched();

            let Some(query) = self.pending.remove(&handle) else {
                tracing::warn!(
                    "Dropping {} completion for unknown call handle {:?}",
                    completion.kind(),
                    handle
                );
                continue;
            };
            self.advance(query, completion);
        }
    }

    fn advance(&mut self, query: PendingQuery, completion: Completion) {
        match query {
            PendingQuery::Leaderboard(query) => {
                let progress = query.on_completion(&mut self.client, completion);
                self.track(progress, PendingQuery::Leaderboard);
            }
            PendingQuery::Workshop(query) => {
                let progress = query.on_completion(&mut self.client, completion);
                self.track(progress, PendingQuery::Workshop);
            }
        }
    }
}

/// Owner of the running native session.
///
/// Exists only after the client initialized successfully; queries go through the
/// [`SessionHandle`]s it hands out.
pub struct NativeSession {
    handle: SessionHandle,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl NativeSession {
    /// Initialize `client` and start the polling loop
    pub fn start<C: NativeClient>(
        mut client: C,
        settings: SessionSettings,
        metrics: Arc<Metrics>,
    ) -> Result<Self, StartupError> {
        client.init()?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));

        let poller = Poller {
            client,
            pending: HashMap::new(),
            commands: commands_rx,
            settings,
            stop: stop.clone(),
            metrics,
        };

        let thread = thread::Builder::new()
            .name("steam-callbacks".to_string())
            .spawn(move || poller.run())
            .map_err(|e| {
                StartupError::InitFailed(format!("failed to spawn callback loop: {}", e))
            })?;

        tracing::info!("Native session started");

        Ok(Self {
            handle: SessionHandle {
                commands: commands_tx,
            },
            stop,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stop the polling loop and tear the native client down
    pub fn shutdown(mut self) {
        self.stop_loop();
    }

    fn stop_loop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.stop.store(true, Ordering::Release);
        if thread.join().is_err() {
            tracing::error!("Native callback loop panicked");
        }
        tracing::info!("Native session shut down");
    }
}

impl Drop for NativeSession {
    fn drop(&mut self) {
        self.stop_loop();
    }
}

/// Cloneable entry point for issuing queries against a [`NativeSession`]
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    /// False once the session has been torn down
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    pub async fn leaderboard(
        &self,
        name: impl Into<String>,
        selector: LeaderboardSelector,
    ) -> Result<LeaderboardResult, QueryError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Leaderboard {
            name: name.into(),
            selector,
            reply,
        })?;
        rx.await.map_err(|_| QueryError::SessionClosed)?
    }

    pub async fn workshop(&self, search: WorkshopSearch) -> Result<Vec<CatalogEntry>, QueryError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Workshop { search, reply })?;
        rx.await.map_err(|_| QueryError::SessionClosed)?
    }

    pub async fn persona_name(&self, user: SteamId) -> Result<String, QueryError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::PersonaName { user, reply })?;
        rx.await.map_err(|_| QueryError::SessionClosed)
    }

    fn send(&self, command: Command) -> Result<(), QueryError> {
        self.commands
            .send(command)
            .map_err(|_| QueryError::SessionClosed)
    }
}
