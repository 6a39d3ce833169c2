//! Error types for the session layer.

use roomcast_protocol::ErrorCode;
use roomcast_transport::ConnectionId;

/// Errors that can occur while registering, authenticating, or tracking
/// connections.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Registration of a username that is already taken. Registrations
    /// never overwrite.
    #[error("username {0:?} is already registered")]
    AlreadyExists(String),

    /// Login for a username nobody registered.
    #[error("unknown user {0:?}")]
    UnknownUser(String),

    /// The credential doesn't match the stored hash.
    #[error("bad credential for user {0:?}")]
    BadCredential(String),

    /// A room or message operation named an unregistered username.
    #[error("user {0:?} is not registered")]
    NotRegistered(String),

    /// The connection is already authenticated (as anyone).
    #[error("{0} is already logged in")]
    AlreadyLoggedIn(ConnectionId),

    /// The operation needs an authenticated connection, or named a user
    /// other than the one logged in on it.
    #[error("not logged in as {0:?}")]
    NotLoggedIn(String),

    /// The hashing backend failed.
    #[error("credential hashing failed: {0}")]
    Hashing(String),
}

impl SessionError {
    /// The wire error this maps to.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyExists(_) => ErrorCode::AlreadyExists,
            Self::UnknownUser(_) => ErrorCode::UnknownUser,
            Self::BadCredential(_) => ErrorCode::BadCredential,
            Self::NotRegistered(_) => ErrorCode::NotRegistered,
            Self::AlreadyLoggedIn(_) => ErrorCode::AlreadyLoggedIn,
            Self::NotLoggedIn(_) => ErrorCode::NotLoggedIn,
            Self::Hashing(_) => ErrorCode::Internal,
        }
    }
}
