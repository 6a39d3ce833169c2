//! The shared hub: credentials, live connections and chatrooms behind
//! one lock.
//!
//! Compound operations that touch more than one component (register
//! then attach, detach then leave the room) run under a single
//! acquisition, so no other connection ever observes them half-done.
//! Password hashing and verification run on the blocking pool with the
//! lock released.

use roomcast_protocol::RoomSummary;
use roomcast_room::{ChatroomDirectory, JoinOutcome, RoomError};
use roomcast_session::{
    ConnectionRegistry, CredentialConfig, CredentialHash, CredentialStore, DetachResult,
    Outbox, SessionError,
};
use roomcast_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::ChatError;

struct HubState {
    credentials: CredentialStore,
    registry: ConnectionRegistry,
    rooms: ChatroomDirectory,
}

impl HubState {
    /// `username` is registered and `conn` is still attached as them.
    ///
    /// A connection pruned by a broadcast fails here even though its
    /// handler has not noticed yet.
    fn ensure_owner(&self, conn: ConnectionId, username: &str) -> Result<(), ChatError> {
        self.credentials.ensure_registered(username)?;
        if self.registry.owner(conn) != Some(username) {
            return Err(SessionError::NotLoggedIn(username.to_string()).into());
        }
        Ok(())
    }
}

/// Shared chat state. Cheap to share behind an `Arc`; every method
/// takes `&self`.
pub struct ChatHub {
    state: Mutex<HubState>,
}

impl ChatHub {
    /// Creates an empty hub hashing new credentials with `credentials`.
    pub fn new(credentials: CredentialConfig) -> Self {
        Self {
            state: Mutex::new(HubState {
                credentials: CredentialStore::new(credentials),
                registry: ConnectionRegistry::new(),
                rooms: ChatroomDirectory::new(),
            }),
        }
    }

    /// Registers `username` and logs `conn` in as them.
    ///
    /// Of two concurrent registrations of one name, exactly one wins; the
    /// other gets `AlreadyExists` and nothing is overwritten.
    pub async fn register(
        &self,
        username: &str,
        credential: &str,
        conn: ConnectionId,
        outbox: Outbox,
    ) -> Result<(), ChatError> {
        let config = {
            let state = self.state.lock().await;
            if state.credentials.contains(username) {
                return Err(SessionError::AlreadyExists(username.to_string()).into());
            }
            if state.registry.owner(conn).is_some() {
                return Err(SessionError::AlreadyLoggedIn(conn).into());
            }
            state.credentials.config().clone()
        };

        let credential = credential.to_string();
        let hash = tokio::task::spawn_blocking(move || CredentialHash::new(&config, &credential))
            .await
            .map_err(|e| SessionError::Hashing(e.to_string()))??;

        // Re-checked by insert: another registration may have won while
        // we were hashing.
        let mut state = self.state.lock().await;
        state.credentials.insert(username, hash)?;
        state.registry.attach(username, conn, outbox)?;

        tracing::info!(username, %conn, "user registered and logged in");
        Ok(())
    }

    /// Checks `credential` against the stored hash for `username`.
    ///
    /// # Errors
    /// `UnknownUser` if nobody registered `username`, `BadCredential`
    /// if the credential doesn't match.
    pub async fn authenticate(&self, username: &str, credential: &str) -> Result<(), ChatError> {
        let hash = self.state.lock().await.credentials.lookup(username)?;

        let credential = credential.to_string();
        let matches = tokio::task::spawn_blocking(move || hash.verify(&credential))
            .await
            .map_err(|e| SessionError::Hashing(e.to_string()))??;
        if !matches {
            tracing::warn!(username, "bad credential");
            return Err(SessionError::BadCredential(username.to_string()).into());
        }
        Ok(())
    }

    /// Checks `credential` and logs `conn` in as `username`.
    ///
    /// Returns the room the user is already in, if any (they may be
    /// logged in from another connection).
    pub async fn login(
        &self,
        username: &str,
        credential: &str,
        conn: ConnectionId,
        outbox: Outbox,
    ) -> Result<Option<String>, ChatError> {
        self.authenticate(username, credential).await?;

        let mut state = self.state.lock().await;
        let connections = state.registry.attach(username, conn, outbox)?;
        let room = state.rooms.current_room(username).map(str::to_string);

        tracing::info!(username, %conn, connections, room = ?room, "user logged in");
        Ok(room)
    }

    /// Drops `conn` from the registry. If it was the owner's last
    /// connection, the owner also leaves their chatroom.
    ///
    /// Idempotent: handler teardown and broadcast pruning may both call
    /// this for the same connection.
    pub async fn detach(&self, conn: ConnectionId) -> DetachResult {
        let mut state = self.state.lock().await;
        let result = state.registry.detach(conn);

        if let DetachResult::LoggedOut { username } = &result {
            match state.rooms.remove_member(username) {
                Some(room) => {
                    tracing::info!(username = %username, room = %room, "user offline, left room")
                }
                None => tracing::info!(username = %username, "user offline"),
            }
        }
        result
    }

    /// Creates `room` with `username` as its first member.
    ///
    /// Every room operation acts on behalf of `conn`, which must still be
    /// logged in as `username`.
    pub async fn create_room(
        &self,
        conn: ConnectionId,
        username: &str,
        room: &str,
    ) -> Result<(), ChatError> {
        let mut state = self.state.lock().await;
        state.ensure_owner(conn, username)?;
        state.rooms.create(username, room)?;
        Ok(())
    }

    /// Moves `username` into `room`, leaving any other room first.
    pub async fn join_room(
        &self,
        conn: ConnectionId,
        username: &str,
        room: &str,
    ) -> Result<JoinOutcome, ChatError> {
        let mut state = self.state.lock().await;
        state.ensure_owner(conn, username)?;
        Ok(state.rooms.join(username, room)?)
    }

    /// Takes `username` out of their room and returns its name.
    pub async fn leave_room(
        &self,
        conn: ConnectionId,
        username: &str,
    ) -> Result<String, ChatError> {
        let mut state = self.state.lock().await;
        state.ensure_owner(conn, username)?;
        Ok(state.rooms.leave(username)?)
    }

    /// Every room and its members, ascending by name.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        self.state.lock().await.rooms.list()
    }

    pub async fn current_room(&self, username: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .rooms
            .current_room(username)
            .map(str::to_string)
    }

    /// Checks that `sender` is in `room` and snapshots the outbox of
    /// every live connection of every member, sender included.
    pub async fn broadcast_targets(
        &self,
        conn: ConnectionId,
        room: &str,
        sender: &str,
    ) -> Result<Vec<(ConnectionId, Outbox)>, ChatError> {
        let state = self.state.lock().await;
        state.ensure_owner(conn, sender)?;
        if state.rooms.current_room(sender) != Some(room) {
            return Err(RoomError::NotInRoom(sender.to_string()).into());
        }

        let members = state.rooms.members(room).unwrap_or_default();
        Ok(members
            .iter()
            .flat_map(|member| state.registry.live_connections(member))
            .collect())
    }

    /// Whether `username` has at least one live connection.
    pub async fn is_active(&self, username: &str) -> bool {
        self.state.lock().await.registry.is_active(username)
    }

    /// How many connections `username` is logged in from.
    pub async fn connection_count(&self, username: &str) -> usize {
        self.state.lock().await.registry.connection_count(username)
    }

    pub async fn is_registered(&self, username: &str) -> bool {
        self.state.lock().await.credentials.contains(username)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use roomcast_protocol::ErrorCode;
    use roomcast_session::{OutboxReceiver, outbox};

    use super::*;

    fn hub() -> ChatHub {
        ChatHub::new(CredentialConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
    }

    async fn sign_up(hub: &ChatHub, username: &str, conn: u64) -> OutboxReceiver {
        let (tx, rx) = outbox(8);
        hub.register(username, "pw", ConnectionId::new(conn), tx)
            .await
            .unwrap();
        rx
    }

    // =====================================================================
    // register() / login()
    // =====================================================================

    #[tokio::test]
    async fn test_register_new_user_logs_in() {
        let hub = hub();
        let _rx = sign_up(&hub, "alice", 1).await;

        assert!(hub.is_registered("alice").await);
        assert!(hub.is_active("alice").await);
    }

    #[tokio::test]
    async fn test_register_concurrent_same_name_exactly_one_wins() {
        let hub = Arc::new(hub());

        let attempts: Vec<_> = (0..8u64)
            .map(|i| {
                let hub = Arc::clone(&hub);
                tokio::spawn(async move {
                    let (tx, _rx) = outbox(8);
                    hub.register("alice", "pw", ConnectionId::new(100 + i), tx)
                        .await
                })
            })
            .collect();

        let mut wins = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(()) => wins += 1,
                Err(e) => assert_eq!(e.code(), ErrorCode::AlreadyExists),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(hub.connection_count("alice").await, 1);
    }

    #[tokio::test]
    async fn test_login_wrong_credential_is_not_attached() {
        let hub = hub();
        let _rx = sign_up(&hub, "alice", 1).await;
        let (tx, _rx2) = outbox(8);

        let err = hub
            .login("alice", "nope", ConnectionId::new(2), tx)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::BadCredential);
        assert_eq!(hub.connection_count("alice").await, 1);
    }

    #[tokio::test]
    async fn test_login_unknown_user_returns_unknown_user() {
        let hub = hub();
        let (tx, _rx) = outbox(8);

        let err = hub
            .login("ghost", "pw", ConnectionId::new(1), tx)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::UnknownUser);
    }

    #[tokio::test]
    async fn test_login_second_device_reports_current_room() {
        let hub = hub();
        let _rx = sign_up(&hub, "alice", 1).await;
        hub.create_room(ConnectionId::new(1), "alice", "general").await.unwrap();
        let (tx, _rx2) = outbox(8);

        let room = hub
            .login("alice", "pw", ConnectionId::new(2), tx)
            .await
            .unwrap();

        assert_eq!(room.as_deref(), Some("general"));
        assert_eq!(hub.connection_count("alice").await, 2);
    }

    #[tokio::test]
    async fn test_authenticate_checks_stored_credential() {
        let hub = hub();
        let _rx = sign_up(&hub, "alice", 1).await;

        assert!(hub.authenticate("alice", "pw").await.is_ok());
        let err = hub.authenticate("alice", "nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadCredential);
        let err = hub.authenticate("ghost", "pw").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownUser);
    }

    // =====================================================================
    // detach()
    // =====================================================================

    #[tokio::test]
    async fn test_detach_last_connection_leaves_room() {
        let hub = hub();
        let _rx = sign_up(&hub, "alice", 1).await;
        hub.create_room(ConnectionId::new(1), "alice", "general").await.unwrap();

        let result = hub.detach(ConnectionId::new(1)).await;

        assert!(matches!(result, DetachResult::LoggedOut { .. }));
        assert_eq!(hub.current_room("alice").await, None);
        assert!(!hub.is_active("alice").await);
        // The room itself survives.
        assert_eq!(hub.list_rooms().await[0].to_string(), "general|");
    }

    #[tokio::test]
    async fn test_detach_one_of_two_keeps_room() {
        let hub = hub();
        let _rx = sign_up(&hub, "alice", 1).await;
        let (tx, _rx2) = outbox(8);
        hub.login("alice", "pw", ConnectionId::new(2), tx)
            .await
            .unwrap();
        hub.create_room(ConnectionId::new(1), "alice", "general").await.unwrap();

        hub.detach(ConnectionId::new(1)).await;

        assert_eq!(hub.current_room("alice").await.as_deref(), Some("general"));
        assert_eq!(hub.detach(ConnectionId::new(1)).await, DetachResult::NotAttached);
    }

    // =====================================================================
    // rooms
    // =====================================================================

    #[tokio::test]
    async fn test_create_room_unregistered_returns_not_registered() {
        let hub = hub();

        let err = hub.create_room(ConnectionId::new(9), "ghost", "general").await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::NotRegistered);
        assert!(hub.list_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_room_from_foreign_connection_returns_not_logged_in() {
        let hub = hub();
        let _a = sign_up(&hub, "alice", 1).await;
        let _b = sign_up(&hub, "bob", 2).await;

        let err = hub
            .create_room(ConnectionId::new(2), "alice", "general")
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::NotLoggedIn);
        assert!(hub.list_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_room_commands_after_detach_return_not_logged_in() {
        let hub = hub();
        let _a = sign_up(&hub, "alice", 1).await;
        let _b = sign_up(&hub, "bob", 2).await;
        hub.create_room(ConnectionId::new(2), "bob", "general")
            .await
            .unwrap();
        hub.detach(ConnectionId::new(1)).await;

        let alice = ConnectionId::new(1);
        let create = hub.create_room(alice, "alice", "ghost").await.unwrap_err();
        let join = hub.join_room(alice, "alice", "general").await.unwrap_err();
        let leave = hub.leave_room(alice, "alice").await.unwrap_err();

        for err in [create, join, leave] {
            assert_eq!(err.code(), ErrorCode::NotLoggedIn);
        }
        assert_eq!(hub.current_room("alice").await, None);
        assert_eq!(hub.list_rooms().await.len(), 1);
    }

    #[tokio::test]
    async fn test_join_room_while_in_other_moves_user() {
        let hub = hub();
        let _a = sign_up(&hub, "alice", 1).await;
        let _b = sign_up(&hub, "bob", 2).await;
        hub.create_room(ConnectionId::new(1), "alice", "general").await.unwrap();
        hub.create_room(ConnectionId::new(2), "bob", "other").await.unwrap();

        let outcome = hub.join_room(ConnectionId::new(1), "alice", "other").await.unwrap();

        assert_eq!(outcome, JoinOutcome::Moved { from: "general".into() });
        assert_eq!(hub.current_room("alice").await.as_deref(), Some("other"));
    }

    #[tokio::test]
    async fn test_broadcast_targets_include_every_member_connection() {
        let hub = hub();
        let _a = sign_up(&hub, "alice", 1).await;
        let _b = sign_up(&hub, "bob", 2).await;
        let (tx, _b2) = outbox(8);
        hub.login("bob", "pw", ConnectionId::new(3), tx).await.unwrap();
        let _c = sign_up(&hub, "carol", 4).await;
        hub.create_room(ConnectionId::new(1), "alice", "general").await.unwrap();
        hub.join_room(ConnectionId::new(2), "bob", "general").await.unwrap();

        let mut ids: Vec<u64> = hub
            .broadcast_targets(ConnectionId::new(1), "general", "alice")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id.into_inner())
            .collect();
        ids.sort();

        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_broadcast_targets_non_member_returns_not_in_room() {
        let hub = hub();
        let _a = sign_up(&hub, "alice", 1).await;
        let _b = sign_up(&hub, "bob", 2).await;
        hub.create_room(ConnectionId::new(1), "alice", "general").await.unwrap();

        let err = hub.broadcast_targets(ConnectionId::new(2), "general", "bob").await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::NotInRoom);
    }
}
