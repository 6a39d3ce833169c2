//! Chatroom directory: creates rooms and tracks who is in which one.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use roomcast_protocol::RoomSummary;

use crate::RoomError;

/// What a successful [`ChatroomDirectory::join`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The user had no room and is now a member.
    Joined,

    /// The user left `from` and joined the requested room.
    Moved { from: String },

    /// The user was already in the requested room. Nothing changed.
    AlreadyMember,
}

/// All chatrooms and the membership relation.
///
/// Two views of the same relation, always updated together:
/// `rooms[r]` holds the members of `r`, and `membership[u] = r` iff
/// `u ∈ rooms[r]`. A user appears in at most one room.
///
/// Rooms are kept in a `BTreeMap` and members in `BTreeSet`s so that
/// listings come out in ascending name order without sorting.
#[derive(Debug, Default)]
pub struct ChatroomDirectory {
    /// Every room that has ever been created, keyed by name.
    rooms: BTreeMap<String, BTreeSet<String>>,

    /// Maps each user to the room they're currently in.
    membership: HashMap<String, String>,
}

impl ChatroomDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `room` with `username` as its sole member.
    ///
    /// # Errors
    /// - [`RoomError::RoomExists`] — the name is taken
    /// - [`RoomError::AlreadyInRoom`] — the creator is in a room already
    pub fn create(&mut self, username: &str, room: &str) -> Result<(), RoomError> {
        if self.rooms.contains_key(room) {
            return Err(RoomError::RoomExists(room.to_string()));
        }
        if let Some(current) = self.membership.get(username) {
            return Err(RoomError::AlreadyInRoom {
                username: username.to_string(),
                room: current.clone(),
            });
        }

        self.rooms
            .insert(room.to_string(), BTreeSet::from([username.to_string()]));
        self.membership
            .insert(username.to_string(), room.to_string());

        tracing::info!(username, room, "room created");
        Ok(())
    }

    /// Puts `username` into `room`, leaving their current room first if
    /// it's a different one.
    ///
    /// # Errors
    /// Returns [`RoomError::RoomNotFound`] if `room` doesn't exist. The
    /// user's current membership is untouched in that case.
    pub fn join(&mut self, username: &str, room: &str) -> Result<JoinOutcome, RoomError> {
        if !self.rooms.contains_key(room) {
            return Err(RoomError::RoomNotFound(room.to_string()));
        }

        let outcome = match self.membership.get(username).cloned() {
            Some(current) if current == room => return Ok(JoinOutcome::AlreadyMember),
            Some(from) => {
                self.remove_member(username);
                JoinOutcome::Moved { from }
            }
            None => JoinOutcome::Joined,
        };

        if let Some(members) = self.rooms.get_mut(room) {
            members.insert(username.to_string());
        }
        self.membership
            .insert(username.to_string(), room.to_string());

        tracing::info!(username, room, ?outcome, "room joined");
        Ok(outcome)
    }

    /// Removes `username` from their room and returns its name. The room
    /// itself stays, even if it is now empty.
    ///
    /// # Errors
    /// Returns [`RoomError::NotInRoom`] if the user has no membership.
    pub fn leave(&mut self, username: &str) -> Result<String, RoomError> {
        let room = self
            .remove_member(username)
            .ok_or_else(|| RoomError::NotInRoom(username.to_string()))?;
        tracing::info!(username, room = %room, "room left");
        Ok(room)
    }

    /// Teardown variant of [`leave`](Self::leave): removes the user's
    /// membership if there is one, never errors.
    pub fn remove_member(&mut self, username: &str) -> Option<String> {
        let room = self.membership.remove(username)?;
        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(username);
        }
        Some(room)
    }

    /// Every room with its members, ascending by name.
    pub fn list(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .map(|(name, members)| RoomSummary {
                name: name.clone(),
                members: members.iter().cloned().collect(),
            })
            .collect()
    }

    /// The room `username` is currently in, if any.
    pub fn current_room(&self, username: &str) -> Option<&str> {
        self.membership.get(username).map(String::as_str)
    }

    /// Members of `room` in ascending order, or `None` if it doesn't exist.
    pub fn members(&self, room: &str) -> Option<Vec<String>> {
        self.rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
    }

    pub fn contains(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    /// Number of rooms (empty ones included).
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
