//! The RPC façade: the four proxy operations and JSON-RPC method dispatch.

use super::protocol::{Params, Request, Response, RpcError};
use crate::metrics::Metrics;
use crate::models::records::{LeaderboardEntryRecord, LeaderboardResponse, WorkshopLevelRecord};
use crate::models::steam::SteamId;
use crate::services::{
    LeaderboardResult, LeaderboardSelector, QueryError, SessionHandle, WorkshopSearch,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Methods exposed over JSON-RPC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GetLeaderboardRange,
    GetLeaderboardPlayers,
    GetWorkshopLevels,
    GetPersonaName,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GetLeaderboardRange" => Some(Method::GetLeaderboardRange),
            "GetLeaderboardPlayers" => Some(Method::GetLeaderboardPlayers),
            "GetWorkshopLevels" => Some(Method::GetWorkshopLevels),
            "GetPersonaName" => Some(Method::GetPersonaName),
            _ => None,
        }
    }

    /// Parameter names, in positional order
    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            Method::GetLeaderboardRange => &["leaderboardName", "start", "end"],
            Method::GetLeaderboardPlayers => &["leaderboardName", "players"],
            Method::GetWorkshopLevels => &["maxResults", "searchText"],
            Method::GetPersonaName => &["steamId"],
        }
    }
}

/// Translates RPC calls into session queries and query results into wire records
#[derive(Debug, Clone)]
pub struct ProxyService {
    session: SessionHandle,
    metrics: Arc<Metrics>,
}

impl ProxyService {
    pub fn new(session: SessionHandle, metrics: Arc<Metrics>) -> Self {
        Self { session, metrics }
    }

    pub async fn get_leaderboard_range(
        &self,
        leaderboard_name: &str,
        start: i32,
        end: i32,
    ) -> Result<LeaderboardResponse, QueryError> {
        let result = self
            .session
            .leaderboard(leaderboard_name, LeaderboardSelector::Range { start, end })
            .await?;
        Ok(leaderboard_response(result))
    }

    pub async fn get_leaderboard_players(
        &self,
        leaderboard_name: &str,
        players: &[u64],
    ) -> Result<LeaderboardResponse, QueryError> {
        let users = players.iter().copied().map(SteamId).collect();
        let result = self
            .session
            .leaderboard(leaderboard_name, LeaderboardSelector::Users(users))
            .await?;
        Ok(leaderboard_response(result))
    }

    pub async fn get_workshop_levels(
        &self,
        max_results: u32,
        search_text: Option<String>,
    ) -> Result<Vec<WorkshopLevelRecord>, QueryError> {
        let entries = self
            .session
            .workshop(WorkshopSearch {
                max_results,
                search_text,
            })
            .await?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                WorkshopLevelRecord::new(entry.details, entry.author_name, entry.preview_url)
            })
            .collect())
    }

    pub async fn get_persona_name(&self, steam_id: u64) -> Result<String, QueryError> {
        self.session.persona_name(SteamId(steam_id)).await
    }

    /// Run one method with raw JSON params
    pub async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        let method = Method::from_name(method).ok_or_else(|| RpcError::method_not_found(method))?;
        let mut params = Params::parse(params, method.param_names())?;

        match method {
            Method::GetLeaderboardRange => {
                let name: String = params.required(0)?;
                let start: i32 = params.required(1)?;
                let end: i32 = params.required(2)?;
                to_json(self.get_leaderboard_range(&name, start, end).await?)
            }
            Method::GetLeaderboardPlayers => {
                let name: String = params.required(0)?;
                let players: Vec<u64> = params.required(1)?;
                to_json(self.get_leaderboard_players(&name, &players).await?)
            }
            Method::GetWorkshopLevels => {
                let max_results: u32 = params.required(0)?;
                let search_text: Option<String> = params.optional(1)?;
                to_json(self.get_workshop_levels(max_results, search_text).await?)
            }
            Method::GetPersonaName => {
                let steam_id: u64 = params.required(0)?;
                to_json(self.get_persona_name(steam_id).await?)
            }
        }
    }

    /// Handle one framed message; `None` for notifications
    pub async fn handle_message(&self, body: &[u8]) -> Option<Response> {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                self.metrics.record_request_failed();
                return Some(Response::failure(Value::Null, RpcError::parse_error(e)));
            }
        };

        if value.is_array() {
            self.metrics.record_request_failed();
            return Some(Response::failure(
                Value::Null,
                RpcError::invalid_request("batch requests are not supported"),
            ));
        }

        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                self.metrics.record_request_failed();
                return Some(Response::failure(Value::Null, RpcError::invalid_request(e)));
            }
        };

        tracing::debug!("RPC call {} (id {:?})", request.method, request.id);
        let result = self.dispatch(&request.method, request.params).await;

        match &result {
            Ok(_) => self.metrics.record_request_served(),
            Err(error) => {
                tracing::warn!("RPC call {} failed: {}", request.method, error);
                self.metrics.record_request_failed();
            }
        }

        let id = request.id?;
        Some(match result {
            Ok(value) => Response::success(id, value),
            Err(error) => Response::failure(id, error),
        })
    }
}

fn leaderboard_response(result: LeaderboardResult) -> LeaderboardResponse {
    LeaderboardResponse {
        entries: result
            .entries
            .into_iter()
            .map(|ranked| LeaderboardEntryRecord::new(&ranked.entry, ranked.player_name))
            .collect(),
        total_entries: result.total_entries,
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(RpcError::internal)
}
