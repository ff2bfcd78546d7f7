//! `LingoforgeServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session registry →
//! session store and room actors.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lingoforge_protocol::{Codec, JsonCodec};
use lingoforge_room::{RoomConfig, SessionStore};
use lingoforge_session::ConnectionRegistry;
use lingoforge_transport::{Transport, WebSocketTransport};

use crate::LingoforgeError;
use crate::handler::handle_connection;

/// Everything a server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// A connection that sends nothing for this long is closed. Clients
    /// keep quiet connections alive with `ping`.
    pub idle_timeout: Duration,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout: Duration::from_secs(60),
            room: RoomConfig::default(),
        }
    }
}

/// Shared state handed to each connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) store: SessionStore,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Lingoforge server.
///
/// ```rust,ignore
/// let server = LingoforgeServer::builder()
///     .bind("0.0.0.0:8080")
///     .idle_timeout(Duration::from_secs(90))
///     .build()
///     .await?;
/// ```
pub struct LingoforgeServerBuilder {
    config: ServerConfig,
}

impl LingoforgeServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Settings shared by every room: eviction timeouts, mode rules, seed.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener. Uses `JsonCodec` over `WebSocketTransport`.
    pub async fn build(self) -> Result<LingoforgeServer<JsonCodec>, LingoforgeError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let registry = ConnectionRegistry::new();
        let store = SessionStore::new(registry.clone(), self.config.room);

        let state = Arc::new(ServerState {
            store,
            registry,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(LingoforgeServer { transport, state })
    }
}

impl Default for LingoforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Lingoforge server. Call [`run`](Self::run) to start accepting.
pub struct LingoforgeServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl LingoforgeServer<JsonCodec> {
    pub fn builder() -> LingoforgeServerBuilder {
        LingoforgeServerBuilder::new()
    }
}

impl<C: Codec> LingoforgeServer<C> {
    pub fn local_addr(&self) -> Result<SocketAddr, LingoforgeError> {
        Ok(self.transport.local_addr()?)
    }

    /// The live rooms. Useful for embedding and tests.
    pub fn store(&self) -> &SessionStore {
        &self.state.store
    }

    /// Accepts connections until the process ends.
    pub async fn run(self) -> Result<(), LingoforgeError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then stops every room.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), LingoforgeError> {
        let addr = self.transport.local_addr()?;
        tracing::info!(%addr, "Lingoforge server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
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
                () = &mut shutdown => break,
            }
        }

        tracing::info!(rooms = self.state.store.len(), "shutting down");
        self.state.store.shutdown_all().await;
        Ok(())
    }
}
