//! `BullpenServer` builder and server loop.
//!
//! This is the entry point for running a Bullpen game server. It ties
//! together all the layers: transport → protocol → room engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bullpen_protocol::{Codec, JsonCodec};
use bullpen_room::{RoomConfig, SessionEngine};
use bullpen_transport::{Transport, WebSocketTransport};

use crate::config::{DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_MESSAGE_BYTES};
use crate::handler::handle_connection;
use crate::{BullpenError, ConnectionRegistry, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C> {
    pub(crate) engine: SessionEngine<ConnectionRegistry>,
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) codec: C,
    pub(crate) connection_timeout: Duration,
    pub(crate) max_message_bytes: usize,
}

/// Builder for configuring and starting a Bullpen server.
///
/// # Example
///
/// ```rust,no_run
/// use bullpen::prelude::*;
///
/// # async fn start() -> Result<(), BullpenError> {
/// let server = BullpenServer::builder()
///     .bind("0.0.0.0:5000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    connection_timeout: Duration,
    max_message_bytes: usize,
    reap_interval: Duration,
}

impl ServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            room_config: RoomConfig::default(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            reap_interval: Duration::from_secs(60),
        }
    }

    /// Applies every setting from a [`ServerConfig`].
    pub fn config(self, config: ServerConfig) -> Self {
        self.bind(&config.bind)
            .room_config(config.room)
            .connection_timeout(config.connection_timeout)
            .max_message_bytes(config.max_message_bytes)
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Closes a connection after this long without any inbound frame.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Rejects inbound frames larger than this with a 413 error.
    pub fn max_message_bytes(mut self, limit: usize) -> Self {
        self.max_message_bytes = limit;
        self
    }

    /// How often idle rooms are swept. Only used when the room config has
    /// an idle timeout.
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<BullpenServer<JsonCodec>, BullpenError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let registry = Arc::new(ConnectionRegistry::new());
        let state = Arc::new(ServerState {
            engine: SessionEngine::new(Arc::clone(&registry), self.room_config),
            registry,
            codec: JsonCodec,
            connection_timeout: self.connection_timeout,
            max_message_bytes: self.max_message_bytes,
        });

        Ok(BullpenServer {
            transport,
            state,
            reap_interval: self.reap_interval,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Bullpen game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BullpenServer<C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    reap_interval: Duration,
}

impl BullpenServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }
}

impl<C: Codec> BullpenServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), BullpenError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Connections already being handled keep running after shutdown.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), BullpenError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Bullpen server running");

        let reaper = self.spawn_reaper();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        if let Some(reaper) = reaper {
            reaper.abort();
        }
        self.transport.shutdown().await?;
        Ok(())
    }

    /// Starts the idle-room sweep if rooms have an idle timeout.
    fn spawn_reaper(&self) -> Option<tokio::task::JoinHandle<()>> {
        let max_idle = self.state.engine.store().config().idle_timeout?;
        let state = Arc::clone(&self.state);
        let period = self.reap_interval.max(Duration::from_millis(1));

        tracing::info!(
            idle_secs = max_idle.as_secs(),
            every_secs = period.as_secs(),
            "idle room reaper enabled"
        );

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reaped = state.engine.store().reap_idle(max_idle).await;
                for code in reaped {
                    tracing::debug!(room = %code, "idle room removed");
                }
            }
        }))
    }
}
