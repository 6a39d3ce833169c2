//! Credential hashing configuration.

use serde::{Deserialize, Serialize};

/// Argon2id cost parameters used when hashing new credentials.
///
/// Verification always uses the parameters recorded in the stored hash,
/// so changing these only affects registrations made afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Memory cost in KiB.
    pub memory_kib: u32,

    /// Number of passes over memory.
    pub iterations: u32,

    /// Degree of parallelism (lanes).
    pub parallelism: u32,
}

/// OWASP's minimum recommendation for Argon2id: 19 MiB, 2 passes, 1 lane.
impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_owasp_minimum() {
        let config = CredentialConfig::default();
        assert_eq!(config.memory_kib, 19456);
        assert_eq!(config.iterations, 2);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn test_deserialize_partial_fills_defaults() {
        let config: CredentialConfig =
            serde_json::from_str(r#"{ "iterations": 3 }"#).unwrap();
        assert_eq!(config.iterations, 3);
        assert_eq!(config.memory_kib, 19456);
    }
}
