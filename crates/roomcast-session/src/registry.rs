//! Live connection tracking.
//!
//! Maps each logged-in user to the set of connections they're logged in
//! from. A user is "online" while that set is non-empty.

use std::collections::HashMap;

use roomcast_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::SessionError;

/// The sending half of a connection's outbound queue.
///
/// Broadcasts push formatted chat lines here; the connection's handler
/// drains the receiving half onto the wire.
pub type Outbox = mpsc::Sender<String>;

/// The receiving half of a connection's outbound queue.
pub type OutboxReceiver = mpsc::Receiver<String>;

/// Creates a bounded outbox. `capacity` is clamped to at least 1.
pub fn outbox(capacity: usize) -> (Outbox, OutboxReceiver) {
    mpsc::channel(capacity.max(1))
}

/// What [`ConnectionRegistry::detach`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetachResult {
    /// The connection wasn't attached. Detach is idempotent, so a second
    /// teardown of the same connection lands here.
    NotAttached,

    /// The connection was removed, but the user is still logged in
    /// elsewhere.
    StillActive { username: String, remaining: usize },

    /// That was the user's last connection.
    LoggedOut { username: String },
}

/// Which connections are logged in as which user.
///
/// Two indexes kept in lockstep: `by_user` for broadcast fan-out and
/// `owners` for reverse lookup on disconnect. Every id in `owners`
/// appears in exactly one `by_user` set, and no `by_user` set is empty.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    by_user: HashMap<String, HashMap<ConnectionId, Outbox>>,
    owners: HashMap<ConnectionId, String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs `conn` in as `username`. Returns how many connections the
    /// user now has.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyLoggedIn`] if `conn` is already
    /// attached, as this user or any other.
    pub fn attach(
        &mut self,
        username: &str,
        conn: ConnectionId,
        outbox: Outbox,
    ) -> Result<usize, SessionError> {
        if self.owners.contains_key(&conn) {
            return Err(SessionError::AlreadyLoggedIn(conn));
        }

        self.owners.insert(conn, username.to_string());
        let conns = self.by_user.entry(username.to_string()).or_default();
        conns.insert(conn, outbox);

        tracing::debug!(username, %conn, active = conns.len(), "connection attached");
        Ok(conns.len())
    }

    /// Removes `conn`, whichever user it belongs to.
    pub fn detach(&mut self, conn: ConnectionId) -> DetachResult {
        let Some(username) = self.owners.remove(&conn) else {
            return DetachResult::NotAttached;
        };

        let remaining = match self.by_user.get_mut(&username) {
            Some(conns) => {
                conns.remove(&conn);
                conns.len()
            }
            None => 0,
        };

        tracing::debug!(username = %username, %conn, remaining, "connection detached");

        if remaining == 0 {
            self.by_user.remove(&username);
            DetachResult::LoggedOut { username }
        } else {
            DetachResult::StillActive {
                username,
                remaining,
            }
        }
    }

    /// Snapshot of `username`'s live connections, ordered by id.
    ///
    /// The outboxes are cheap clones, so callers can deliver to them
    /// after releasing whatever lock guards the registry.
    pub fn live_connections(&self, username: &str) -> Vec<(ConnectionId, Outbox)> {
        let mut conns: Vec<_> = self
            .by_user
            .get(username)
            .map(|conns| {
                conns.iter().map(|(id, tx)| (*id, tx.clone())).collect()
            })
            .unwrap_or_default();
        conns.sort_by_key(|(id, _)| *id);
        conns
    }

    /// The user `conn` is logged in as.
    pub fn owner(&self, conn: ConnectionId) -> Option<&str> {
        self.owners.get(&conn).map(String::as_str)
    }

    /// Whether `username` has at least one live connection.
    pub fn is_active(&self, username: &str) -> bool {
        self.by_user.contains_key(username)
    }

    /// How many connections `username` is logged in from.
    pub fn connection_count(&self, username: &str) -> usize {
        self.by_user.get(username).map_or(0, HashMap::len)
    }

    /// Total attached connections across all users.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
