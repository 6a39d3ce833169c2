//! Error types for the room layer.

use roomcast_protocol::ErrorCode;

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// A room with this name already exists.
    #[error("room {0:?} already exists")]
    RoomExists(String),

    /// The room does not exist.
    #[error("room {0:?} not found")]
    RoomNotFound(String),

    /// The user is already a member of a room and tried to create one.
    #[error("user {username:?} is already in room {room:?}")]
    AlreadyInRoom { username: String, room: String },

    /// The user is not a member of any room.
    #[error("user {0:?} is not in a room")]
    NotInRoom(String),
}

impl RoomError {
    /// The wire error this maps to.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RoomExists(_) => ErrorCode::RoomExists,
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::AlreadyInRoom { .. } => ErrorCode::AlreadyInRoom,
            Self::NotInRoom(_) => ErrorCode::NotInRoom,
        }
    }
}
