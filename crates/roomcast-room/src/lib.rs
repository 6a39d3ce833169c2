//! Chatroom directory for roomcast.
//!
//! Tracks which chatrooms exist and which users are in them. A user is
//! a member of at most one chatroom at a time, and rooms are never
//! garbage-collected: an empty room stays listed and can be rejoined.
//!
//! # Key types
//!
//! - [`ChatroomDirectory`] — room existence plus the membership relation
//! - [`JoinOutcome`] — what a successful join actually did
//! - [`RoomError`] — per-request failures, mapped to wire error codes
//!
//! Like the session types, the directory is a plain struct. The hub
//! owns it and serializes access together with the credential store and
//! connection registry.

mod directory;
mod error;

pub use directory::{ChatroomDirectory, JoinOutcome};
pub use error::RoomError;
