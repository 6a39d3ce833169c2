//! # roomcast
//!
//! A multi-room chat server. Clients register or log in with a username
//! and credential, create and join named chatrooms, and send messages
//! that are fanned out to every connection of every member of the room.
//!
//! A user may be logged in from several connections at once and is a
//! member of at most one room at a time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomcast::prelude::*;
//!
//! # async fn demo() -> Result<(), ChatError> {
//! let server = ChatServer::builder()
//!     .bind("127.0.0.1:5000")
//!     .build()
//!     .await?;
//! server
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! # }
//! ```
//!
//! ## Layers
//!
//! - `roomcast-protocol` — length-prefixed frames, commands, responses
//! - `roomcast-transport` — TCP (and optionally WebSocket) connections
//! - `roomcast-session` — credential store and connection registry
//! - `roomcast-room` — chatroom directory
//! - this crate — the shared [`ChatHub`], the [`Broadcaster`], the
//!   per-connection handler and the [`ChatServer`] accept loop

mod broadcast;
mod config;
mod error;
mod handler;
mod hub;
mod server;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use config::ServerConfig;
pub use error::ChatError;
pub use hub::ChatHub;
pub use server::{ChatServer, ChatServerBuilder};

pub use roomcast_protocol as protocol;
pub use roomcast_room as room;
pub use roomcast_session as session;
pub use roomcast_transport as transport;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::{
        BroadcastReport, Broadcaster, ChatError, ChatHub, ChatServer, ChatServerBuilder,
        ServerConfig,
    };
    pub use roomcast_protocol::{Command, ErrorCode, Response};
    pub use roomcast_room::JoinOutcome;
    pub use roomcast_session::{CredentialConfig, DetachResult};
    pub use roomcast_transport::{Connection, ConnectionId, Transport};
}
