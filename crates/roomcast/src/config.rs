//! Server configuration.

use std::path::Path;
use std::time::Duration;

use roomcast_protocol::DEFAULT_MAX_FRAME_LEN;
use roomcast_session::CredentialConfig;
use serde::{Deserialize, Serialize};

use crate::ChatError;

/// Settings for a [`ChatServer`](crate::ChatServer).
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// { "bind_addr": "0.0.0.0:5000", "max_connections": 512 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,

    /// A connection with no inbound frame for this long is closed.
    pub idle_timeout_ms: u64,

    /// Upper bound on a single socket write or outbox push.
    pub write_timeout_ms: u64,

    /// Queued broadcast lines per connection before deliveries start
    /// timing out.
    pub outbox_capacity: usize,

    /// Largest accepted frame payload in bytes.
    pub max_frame_len: usize,

    /// Refuse new connections beyond this many. `None` = unbounded.
    pub max_connections: Option<usize>,

    /// Argon2 cost for new registrations.
    pub credentials: CredentialConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            idle_timeout_ms: 300_000,
            write_timeout_ms: 5000,
            outbox_capacity: 64,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_connections: None,
            credentials: CredentialConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// Parses a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ChatError> {
        serde_json::from_str(raw).map_err(|e| ChatError::Config(e.to_string()))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
