//! Wire protocol for roomcast.
//!
//! This crate defines the "language" that chat clients and the server
//! speak:
//!
//! - **Codec** ([`FrameCodec`]) — where one frame ends and the next one
//!   begins on a byte stream (a 4-byte length prefix).
//! - **Types** ([`Command`], [`Response`], [`ErrorCode`], etc.) — what
//!   goes inside a frame: `|`-delimited text fields.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while framing or
//!   parsing.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (user identity). It doesn't know about connections or rooms — it only
//! knows how to cut a byte stream into frames and frames into fields.
//!
//! ```text
//! Transport (bytes) → Protocol (Command / Response) → Session (user context)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{DEFAULT_MAX_FRAME_LEN, FrameCodec, LENGTH_FIELD_LEN};
pub use error::ProtocolError;
pub use types::{
    ChatLine, Command, ErrorCode, FIELD_DELIMITER, MEMBER_DELIMITER, Response,
    RoomSummary,
};
