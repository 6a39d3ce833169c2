//! Unified error type for roomcast.

use roomcast_protocol::{ErrorCode, ProtocolError};
use roomcast_room::RoomError;
use roomcast_session::SessionError;
use roomcast_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically. Every
/// variant maps to exactly one wire [`ErrorCode`].
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A transport-level error (accept, send, recv, write timeout).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A framing or command decoding error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A credential or login error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A chatroom error.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ChatError {
    /// The reason sent back in `ERROR|<reason>`.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Transport(e) => e.code(),
            Self::Protocol(e) => e.code(),
            Self::Session(e) => e.code(),
            Self::Room(e) => e.code(),
            Self::Config(_) => ErrorCode::Internal,
        }
    }

    /// Returns `true` if the connection that hit this error must close.
    pub fn is_fatal(&self) -> bool {
        self.code().is_fatal()
    }
}
