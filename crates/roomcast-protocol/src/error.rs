//! Error types for the protocol layer.
//!
//! Each crate in roomcast defines its own error enum. When you see a
//! `ProtocolError`, the problem is in framing or parsing, not in
//! networking or room management.

use crate::ErrorCode;

/// Errors that can occur while framing or parsing.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Reading from or writing to the underlying stream failed.
    ///
    /// tokio-util requires a codec's error type to be constructible from
    /// `std::io::Error`, which is what this variant is for.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The length prefix announced more bytes than we accept.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// The payload is not valid UTF-8.
    #[error("frame payload is not valid UTF-8")]
    InvalidUtf8,

    /// The frame carried no command at all.
    #[error("empty frame")]
    EmptyFrame,

    /// The first field is not a verb we recognize.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// A required field is absent or empty.
    #[error("{command} is missing field `{field}`")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },

    /// A name field holds a character reserved by the room listing.
    #[error("{command} field `{field}` contains a reserved character")]
    InvalidField {
        command: &'static str,
        field: &'static str,
    },
}

impl ProtocolError {
    /// The wire error this maps to.
    ///
    /// I/O failures mean the peer is gone; everything else means the
    /// peer sent something we can't make sense of.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::ConnectionLost,
            _ => ErrorCode::MalformedFrame,
        }
    }
}
