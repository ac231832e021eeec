//! Typed async client for the proxy's JSON-RPC surface.

use super::codec::{CodecError, JsonRpcCodec};
use super::protocol::{Request, Response, RpcError};
use crate::models::records::{LeaderboardResponse, WorkshopLevelRecord};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Codec(#[from] CodecError),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("connection closed before a response arrived")]
    ConnectionClosed,
}

/// One connection to a running proxy. Calls are issued one at a time.
pub struct ProxyClient {
    framed: Framed<TcpStream, JsonRpcCodec>,
    next_id: u64,
}

impl ProxyClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: Framed::new(stream, JsonRpcCodec::default()),
            next_id: 0,
        })
    }

    pub async fn get_leaderboard_range(
        &mut self,
        leaderboard_name: &str,
        start: i32,
        end: i32,
    ) -> Result<LeaderboardResponse, ClientError> {
        self.call("GetLeaderboardRange", json!([leaderboard_name, start, end]))
            .await
    }

    pub async fn get_leaderboard_players(
        &mut self,
        leaderboard_name: &str,
        players: &[u64],
    ) -> Result<LeaderboardResponse, ClientError> {
        self.call("GetLeaderboardPlayers", json!([leaderboard_name, players]))
            .await
    }

    pub async fn get_workshop_levels(
        &mut self,
        max_results: u32,
        search_text: Option<&str>,
    ) -> Result<Vec<WorkshopLevelRecord>, ClientError> {
        self.call("GetWorkshopLevels", json!([max_results, search_text]))
            .await
    }

    pub async fn get_persona_name(&mut self, steam_id: u64) -> Result<String, ClientError> {
        self.call("GetPersonaName", json!([steam_id])).await
    }

    /// Send a request and wait for the response carrying its id
    pub async fn call<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<T, ClientError> {
        self.next_id = self.next_id.wrapping_add(1);
        let id = self.next_id;

        let request = Request::new(id, method, params);
        let body = serde_json::to_vec(&request)?;
        tracing::trace!("sending json data: {}", String::from_utf8_lossy(&body));
        self.framed.send(Bytes::from(body)).await?;

        loop {
            let frame = self
                .framed
                .next()
                .await
                .ok_or(ClientError::ConnectionClosed)??;
            let response: Response = serde_json::from_slice(&frame)?;

            if response.id != Value::from(id) {
                tracing::warn!("Ignoring response for unexpected id {}", response.id);
                continue;
            }
            return Ok(response.into_result()?);
        }
    }
}
