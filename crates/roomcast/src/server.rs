//! `ChatServer` builder and accept loop.
//!
//! This is the entry point for running a roomcast server. It ties
//! together all the layers: transport → protocol → hub → handler.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use roomcast_session::CredentialConfig;
use roomcast_transport::{Connection, TcpTransport, Transport};

use crate::handler::{HandlerContext, handle_connection};
use crate::{Broadcaster, ChatError, ChatHub, ServerConfig};

/// Builder for configuring and starting a roomcast server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), roomcast::ChatError> {
/// use roomcast::prelude::*;
///
/// let server = ChatServer::builder()
///     .bind("0.0.0.0:5000")
///     .max_connections(1024)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChatServerBuilder {
    config: ServerConfig,
}

impl ChatServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting at once, e.g. with a loaded config file.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn idle_timeout(mut self, idle: Duration) -> Self {
        self.config.idle_timeout_ms = u64::try_from(idle.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn write_timeout(mut self, write: Duration) -> Self {
        self.config.write_timeout_ms = u64::try_from(write.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn outbox_capacity(mut self, capacity: usize) -> Self {
        self.config.outbox_capacity = capacity;
        self
    }

    pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.config.max_frame_len = max_frame_len;
        self
    }

    /// Refuse connections beyond `max` concurrent ones.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = Some(max);
        self
    }

    /// Argon2 cost for new registrations.
    pub fn credentials(mut self, credentials: CredentialConfig) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Binds a TCP listener on the configured address.
    pub async fn build(self) -> Result<ChatServer<TcpTransport>, ChatError> {
        let transport = TcpTransport::bind(&self.config.bind_addr)
            .await?
            .max_frame_len(self.config.max_frame_len);
        Ok(self.build_with(transport))
    }

    /// Binds a WebSocket listener on the configured address.
    #[cfg(feature = "websocket")]
    pub async fn build_websocket(
        self,
    ) -> Result<ChatServer<roomcast_transport::WebSocketTransport>, ChatError> {
        let transport = roomcast_transport::WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .max_frame_len(self.config.max_frame_len);
        Ok(self.build_with(transport))
    }

    /// Serves connections from an already-bound transport.
    pub fn build_with<T: Transport>(self, transport: T) -> ChatServer<T> {
        let config = self.config;
        let hub = Arc::new(ChatHub::new(config.credentials.clone()));
        let ctx = Arc::new(HandlerContext {
            hub: Arc::clone(&hub),
            broadcaster: Broadcaster::new(Arc::clone(&hub), config.write_timeout()),
            idle_timeout: config.idle_timeout(),
            write_timeout: config.write_timeout(),
            outbox_capacity: config.outbox_capacity,
        });

        ChatServer {
            transport,
            hub,
            ctx,
            active: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }
}

/// A roomcast server bound to a transport.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct ChatServer<T: Transport> {
    transport: T,
    hub: Arc<ChatHub>,
    ctx: Arc<HandlerContext>,
    active: Arc<AtomicUsize>,
    config: ServerConfig,
}

impl ChatServer<TcpTransport> {
    /// Creates a new builder.
    pub fn builder() -> ChatServerBuilder {
        ChatServerBuilder::new()
    }
}

impl<T: Transport> ChatServer<T> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The shared state, for inspection.
    pub fn hub(&self) -> Arc<ChatHub> {
        Arc::clone(&self.hub)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ChatError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Connections already being served keep running on their own tasks.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), ChatError>
    where
        F: Future<Output = ()> + Send,
    {
        tracing::info!(
            addr = ?self.transport.local_addr().ok(),
            max_connections = ?self.config.max_connections,
            "roomcast server running"
        );
        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    break;
                }
                accepted = self.transport.accept() => accepted,
            };

            match accepted {
                Ok(conn) => self.spawn_handler(conn).await,
                Err(e) => tracing::error!(error = %e, "accept failed"),
            }
        }

        Ok(())
    }

    async fn spawn_handler(&self, conn: T::Connection) {
        let current = self.active.fetch_add(1, Ordering::SeqCst);
        if let Some(max) = self.config.max_connections {
            if current >= max {
                self.active.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!(
                    conn_id = %conn.id(),
                    peer = %conn.peer_addr(),
                    max,
                    "connection limit reached, refusing"
                );
                if let Err(e) = conn.close().await {
                    tracing::debug!(conn_id = %conn.id(), error = %e, "close failed");
                }
                return;
            }
        }

        let ctx = Arc::clone(&self.ctx);
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            handle_connection(conn, ctx).await;
            active.fetch_sub(1, Ordering::SeqCst);
        });
    }
}
