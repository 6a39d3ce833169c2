//! Per-connection handler: command dispatch and outbound delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Wait for the next event: an inbound frame, a queued broadcast
//!      line, or the idle deadline
//!   2. Decode and dispatch inbound commands against the hub, reply with
//!      exactly one response frame
//!   3. Write queued broadcast lines straight through
//!   4. On close (logout, EOF, malformed input, idle, eviction): detach
//!      from the hub and close the socket

use std::sync::Arc;
use std::time::Duration;

use roomcast_protocol::{Command, ErrorCode, Response};
use roomcast_room::RoomError;
use roomcast_session::{OutboxReceiver, SessionError, outbox};
use roomcast_transport::{Connection, ConnectionId, TransportError};
use tokio::time::{Instant, sleep_until, timeout};

use crate::{Broadcaster, ChatError, ChatHub};

/// Per-connection limits, shared by every handler of one server.
pub(crate) struct HandlerContext {
    pub(crate) hub: Arc<ChatHub>,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) idle_timeout: Duration,
    pub(crate) write_timeout: Duration,
    pub(crate) outbox_capacity: usize,
}

/// Authentication state of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnState {
    Unauthenticated,
    Authenticated { username: String },
    Closed,
}

enum Event {
    Inbound(Result<Option<String>, TransportError>),
    Outbound(Option<String>),
    Idle,
}

/// Detaches the connection if the handler unwinds before teardown.
///
/// Since `Drop` is synchronous, it spawns a fire-and-forget task for
/// the async lock. The normal exit path disarms it and detaches inline.
struct DetachGuard {
    conn_id: ConnectionId,
    hub: Arc<ChatHub>,
    armed: bool,
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let conn_id = self.conn_id;
        let hub = Arc::clone(&self.hub);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                hub.detach(conn_id).await;
            });
        }
    }
}

struct ConnectionHandler<'a, C: Connection> {
    conn: &'a C,
    ctx: &'a HandlerContext,
    state: ConnState,
    /// Present once authenticated; drained onto the socket.
    outbox: Option<OutboxReceiver>,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Connection>(conn: C, ctx: Arc<HandlerContext>) {
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = %conn.peer_addr(), "connection opened");

    let mut guard = DetachGuard {
        conn_id,
        hub: Arc::clone(&ctx.hub),
        armed: true,
    };

    let mut handler = ConnectionHandler {
        conn: &conn,
        ctx: &ctx,
        state: ConnState::Unauthenticated,
        outbox: None,
    };
    handler.run().await;

    // Teardown. Safe to repeat if a broadcast already pruned us.
    guard.armed = false;
    ctx.hub.detach(conn_id).await;
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    tracing::info!(%conn_id, "connection closed");
}

impl<C: Connection> ConnectionHandler<'_, C> {
    async fn run(&mut self) {
        let conn_id = self.conn.id();
        let mut deadline = Instant::now() + self.ctx.idle_timeout;

        while self.state != ConnState::Closed {
            let event = tokio::select! {
                inbound = self.conn.recv() => Event::Inbound(inbound),
                line = next_outbound(&mut self.outbox) => Event::Outbound(line),
                _ = sleep_until(deadline) => Event::Idle,
            };

            match event {
                Event::Inbound(Ok(Some(payload))) => {
                    deadline = Instant::now() + self.ctx.idle_timeout;
                    self.on_frame(&payload).await;
                }
                Event::Inbound(Ok(None)) => {
                    tracing::debug!(%conn_id, "peer closed the connection");
                    self.state = ConnState::Closed;
                }
                Event::Inbound(Err(TransportError::Malformed(e))) => {
                    tracing::warn!(%conn_id, error = %e, "malformed frame");
                    self.reject_malformed().await;
                }
                Event::Inbound(Err(e)) => {
                    tracing::debug!(%conn_id, error = %e, "receive failed");
                    self.state = ConnState::Closed;
                }
                Event::Outbound(Some(line)) => {
                    if let Err(e) = self.write(&line).await {
                        tracing::debug!(%conn_id, error = %e, "broadcast write failed");
                        self.state = ConnState::Closed;
                    }
                }
                Event::Outbound(None) => {
                    tracing::info!(%conn_id, "evicted by broadcast, closing");
                    self.outbox = None;
                    self.state = ConnState::Closed;
                }
                Event::Idle => {
                    tracing::info!(%conn_id, "idle timeout");
                    self.state = ConnState::Closed;
                }
            }
        }
    }

    /// Decodes one frame, dispatches it and writes the single reply.
    async fn on_frame(&mut self, payload: &str) {
        let conn_id = self.conn.id();

        let command = match Command::decode(payload) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "malformed command");
                self.reject_malformed().await;
                return;
            }
        };
        tracing::debug!(%conn_id, verb = command.verb(), "command received");

        let response = match self.dispatch(command).await {
            Ok(response) => response,
            Err(e) => {
                if e.code() == ErrorCode::Internal {
                    tracing::error!(%conn_id, error = %e, "command failed");
                } else {
                    tracing::debug!(%conn_id, error = %e, "command rejected");
                }
                if e.is_fatal() {
                    self.state = ConnState::Closed;
                }
                Response::Error(e.code())
            }
        };

        if let Err(e) = self.write(&response.encode()).await {
            tracing::debug!(%conn_id, error = %e, "response write failed");
            self.state = ConnState::Closed;
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<Response, ChatError> {
        let ctx = self.ctx;
        let hub = &ctx.hub;

        match command {
            Command::ViewRooms => Ok(Response::RoomList(hub.list_rooms().await)),

            Command::Register {
                username,
                credential,
            } => {
                self.ensure_unauthenticated()?;
                let (tx, rx) = outbox(ctx.outbox_capacity);
                hub.register(&username, &credential, self.conn.id(), tx)
                    .await?;
                self.sign_in(username, rx);
                Ok(Response::Success)
            }

            Command::Login {
                username,
                credential,
            } => {
                self.ensure_unauthenticated()?;
                let (tx, rx) = outbox(ctx.outbox_capacity);
                let room = hub
                    .login(&username, &credential, self.conn.id(), tx)
                    .await?;
                self.sign_in(username, rx);
                Ok(room.map_or(Response::Success, Response::SuccessWith))
            }

            Command::Logout { username } => {
                self.authorize(&username)?;
                tracing::info!(conn_id = %self.conn.id(), username = %username, "logout");
                self.state = ConnState::Closed;
                Ok(Response::Success)
            }

            Command::CreateRoom { username, room } => {
                self.authorize(&username)?;
                hub.create_room(self.conn.id(), &username, &room).await?;
                Ok(Response::Success)
            }

            Command::JoinRoom { username, room } => {
                self.authorize(&username)?;
                hub.join_room(self.conn.id(), &username, &room).await?;
                Ok(Response::Success)
            }

            Command::LeaveRoom { username } => {
                self.authorize(&username)?;
                hub.leave_room(self.conn.id(), &username).await?;
                Ok(Response::Success)
            }

            Command::CurrentInfo { username } => {
                self.authorize(&username)?;
                let room = hub.current_room(&username).await;
                Ok(Response::SuccessWith(
                    room.unwrap_or_else(|| "none".to_string()),
                ))
            }

            Command::Message { username, text } => {
                self.authorize(&username)?;
                let room = hub
                    .current_room(&username)
                    .await
                    .ok_or_else(|| RoomError::NotInRoom(username.clone()))?;
                let report = ctx
                    .broadcaster
                    .broadcast(self.conn.id(), &room, &username, &text)
                    .await?;
                if !report.pruned.is_empty() {
                    tracing::debug!(room = %room, pruned = report.pruned.len(), "broadcast pruned connections");
                }
                Ok(Response::Success)
            }
        }
    }

    fn ensure_unauthenticated(&self) -> Result<(), SessionError> {
        match self.state {
            ConnState::Unauthenticated => Ok(()),
            ConnState::Authenticated { .. } | ConnState::Closed => {
                Err(SessionError::AlreadyLoggedIn(self.conn.id()))
            }
        }
    }

    /// The connection must be logged in, as `username`.
    fn authorize(&self, username: &str) -> Result<(), SessionError> {
        match &self.state {
            ConnState::Authenticated { username: current } if current == username => Ok(()),
            _ => Err(SessionError::NotLoggedIn(username.to_string())),
        }
    }

    fn sign_in(&mut self, username: String, outbox: OutboxReceiver) {
        self.state = ConnState::Authenticated { username };
        self.outbox = Some(outbox);
    }

    /// Best-effort `ERROR|MalformedFrame`, then close.
    async fn reject_malformed(&mut self) {
        let reply = Response::Error(ErrorCode::MalformedFrame).encode();
        if let Err(e) = self.write(&reply).await {
            tracing::debug!(conn_id = %self.conn.id(), error = %e, "malformed-frame reply failed");
        }
        self.state = ConnState::Closed;
    }

    async fn write(&self, frame: &str) -> Result<(), TransportError> {
        timeout(self.ctx.write_timeout, self.conn.send(frame))
            .await
            .map_err(|_| TransportError::TimedOut)?
    }
}

/// Next queued line, or pending forever while there is no outbox.
async fn next_outbound(outbox: &mut Option<OutboxReceiver>) -> Option<String> {
    match outbox {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
