//! Fan-out of chat lines to every connection in a room.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use roomcast_protocol::{ChatLine, Response};
use roomcast_transport::ConnectionId;

use crate::{ChatError, ChatHub};

/// Timestamp layout of a chat line, local time.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of one [`Broadcaster::broadcast`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub room: String,
    /// Connections the line was queued for.
    pub delivered: usize,
    /// Connections that could not take the line and were dropped.
    pub pruned: Vec<ConnectionId>,
}

/// Delivers chat lines to room members through their outboxes.
///
/// Each delivery is a push into a bounded per-connection queue, bounded
/// in time by the write timeout. The connection's own handler does the
/// socket write. A queue that is closed, or still full when the timeout
/// expires, marks a dead or stalled peer: the connection is detached
/// from the hub, and its handler closes once it notices.
#[derive(Clone)]
pub struct Broadcaster {
    hub: Arc<ChatHub>,
    write_timeout: Duration,
}

impl Broadcaster {
    pub fn new(hub: Arc<ChatHub>, write_timeout: Duration) -> Self {
        Self { hub, write_timeout }
    }

    /// Sends `text` from `sender`, writing on connection `conn`, to
    /// everyone in `room`, sender included.
    ///
    /// Fails only if `conn` is no longer logged in as `sender`, or
    /// `sender` is not a member of `room` at call time. Delivery failures are reported, never
    /// returned: they don't stop delivery to anyone else.
    pub async fn broadcast(
        &self,
        conn: ConnectionId,
        room: &str,
        sender: &str,
        text: &str,
    ) -> Result<BroadcastReport, ChatError> {
        let targets = self.hub.broadcast_targets(conn, room, sender).await?;

        let frame = Response::Chat(ChatLine {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            sender: sender.to_string(),
            text: text.to_string(),
        })
        .encode();

        let deliveries = targets.into_iter().map(|(conn, outbox)| {
            let frame = frame.clone();
            let write_timeout = self.write_timeout;
            async move {
                let ok = outbox.send_timeout(frame, write_timeout).await.is_ok();
                (conn, ok)
            }
        });

        let mut delivered = 0;
        let mut pruned = Vec::new();
        for (conn, ok) in join_all(deliveries).await {
            if ok {
                delivered += 1;
            } else {
                pruned.push(conn);
            }
        }

        for conn in &pruned {
            tracing::warn!(%conn, room, "pruning connection that stopped taking messages");
            self.hub.detach(*conn).await;
        }

        tracing::debug!(room, sender, delivered, pruned = pruned.len(), "broadcast sent");
        Ok(BroadcastReport {
            room: room.to_string(),
            delivered,
            pruned,
        })
    }
}
