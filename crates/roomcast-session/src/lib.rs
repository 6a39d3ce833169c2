//! User identity and connection tracking for roomcast.
//!
//! This crate handles who a connection belongs to:
//!
//! 1. **Credentials** — registering users and checking their secrets
//!    ([`CredentialStore`], argon2-hashed)
//! 2. **Connection tracking** — which live connections are logged in as
//!    which user ([`ConnectionRegistry`]); a user may be logged in from
//!    several devices at once
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub (above)  ← combines sessions with room membership under one lock
//!     ↕
//! Session Layer (this crate)  ← user identity and live connections
//!     ↕
//! Protocol / Transport (below)  ← ErrorCode, ConnectionId
//! ```
//!
//! Neither type is thread-safe by itself. They are plain structs owned
//! by the hub, which serializes access.

mod config;
mod credential;
mod error;
mod registry;
mod store;

pub use config::CredentialConfig;
pub use credential::CredentialHash;
pub use error::SessionError;
pub use registry::{ConnectionRegistry, DetachResult, Outbox, OutboxReceiver, outbox};
pub use store::CredentialStore;
