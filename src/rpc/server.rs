use super::codec::{CodecError, JsonRpcCodec};
use super::handlers::ProxyService;
use crate::metrics::Metrics;
use crate::models::ServerSettings;
use bytes::Bytes;
use futures::stream::FuturesUnordered;
use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::codec::Framed;

/// Pause after a failed `accept` before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP listener serving the JSON-RPC façade
pub struct RpcServer {
    listener: TcpListener,
    service: Arc<ProxyService>,
    settings: ServerSettings,
    metrics: Arc<Metrics>,
}

impl RpcServer {
    /// Bind `settings.bind_address` on `port` (0 picks a free port)
    pub async fn bind(
        settings: &ServerSettings,
        port: u16,
        service: ProxyService,
        metrics: Arc<Metrics>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind((settings.bind_address.as_str(), port)).await?;
        Ok(Self {
            listener,
            service: Arc::new(service),
            settings: settings.clone(),
            metrics,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve connections until `shutdown` resolves.
    ///
    /// At most `max_connections` connections are served at once; further clients wait in
    /// the listen backlog. A failing connection is logged and never stops the server.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> io::Result<()> {
        let limit = Arc::new(Semaphore::new(self.settings.max_connections.max(1)));
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        tracing::info!(
            "Serving JSON-RPC on {} (max {} connection(s))",
            self.local_addr()?,
            self.settings.max_connections.max(1)
        );

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = limit.clone().acquire_owned() => permit.map_err(io::Error::other)?,
            };

            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };

            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!("Failed to set TCP_NODELAY on {}: {}", peer, e);
            }

            self.metrics.record_connection_accepted();
            tracing::info!("Accepted connection from {}", peer);

            let service = self.service.clone();
            let metrics = self.metrics.clone();
            let max_message_size = self.settings.max_message_size;
            connections.spawn(async move {
                let _permit = permit;
                match serve_connection(stream, service, max_message_size).await {
                    Ok(()) => tracing::info!("Connection from {} closed", peer),
                    Err(e) => {
                        metrics.record_connection_error();
                        tracing::warn!("Connection from {} failed: {}", peer, e);
                    }
                }
            });

            while let Some(finished) = connections.try_join_next() {
                if let Err(e) = finished {
                    self.metrics.record_connection_error();
                    tracing::error!("Connection task aborted: {}", e);
                }
            }
        }

        tracing::info!(
            "Shutting down JSON-RPC server ({} open connection(s))",
            connections.len()
        );
        connections.shutdown().await;
        Ok(())
    }
}

/// Serve JSON-RPC messages on one stream until the peer closes it.
///
/// Requests are handled concurrently; each response is written as soon as it is ready.
/// Responses still in flight when the peer half-closes are written before returning.
pub async fn serve_connection<S>(
    stream: S,
    service: Arc<ProxyService>,
    max_message_size: usize,
) -> Result<(), CodecError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut frames) = Framed::new(stream, JsonRpcCodec::new(max_message_size)).split();
    let mut in_flight = FuturesUnordered::new();

    loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(body)) => {
                    let service = service.clone();
                    in_flight.push(async move { service.handle_message(&body).await });
                }
                Some(Err(e)) => return Err(e),
                None => break,
            },
            Some(response) = in_flight.next(), if !in_flight.is_empty() => {
                if let Some(response) = response {
                    sink.send(encode(&response)?).await?;
                }
            }
        }
    }

    while let Some(response) = in_flight.next().await {
        if let Some(response) = response {
            sink.send(encode(&response)?).await?;
        }
    }
    Ok(())
}

fn encode(response: &super::protocol::Response) -> Result<Bytes, CodecError> {
    serde_json::to_vec(response)
        .map(Bytes::from)
        .map_err(|e| CodecError::Io(io::Error::other(e)))
}
