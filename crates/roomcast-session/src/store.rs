//! The credential store: registered usernames and their hashed secrets.

use std::collections::HashMap;

use crate::{CredentialConfig, CredentialHash, SessionError};

/// Registered users, keyed by username.
///
/// Registrations are permanent for the process lifetime; there is no
/// delete. Keys are unique: registering a taken name fails instead of
/// overwriting.
///
/// The store never hashes. It sits behind a shared lock, so callers
/// build the [`CredentialHash`] outside the lock and then
/// [`insert`](Self::insert) it, or [`lookup`](Self::lookup) a copy under
/// the lock and verify outside it.
pub struct CredentialStore {
    users: HashMap<String, CredentialHash>,
    config: CredentialConfig,
}

impl CredentialStore {
    /// Creates an empty store hashing new credentials with `config`.
    pub fn new(config: CredentialConfig) -> Self {
        Self {
            users: HashMap::new(),
            config,
        }
    }

    /// The hashing parameters for new registrations.
    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    /// Stores a pre-computed hash for a new username.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyExists`] if the username is taken;
    /// the existing entry is left untouched.
    pub fn insert(
        &mut self,
        username: &str,
        hash: CredentialHash,
    ) -> Result<(), SessionError> {
        use std::collections::hash_map::Entry;

        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => {
                Err(SessionError::AlreadyExists(username.to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(hash);
                tracing::info!(username, "user registered");
                Ok(())
            }
        }
    }

    /// Returns a copy of the stored hash for `username`.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownUser`] if nobody registered it.
    pub fn lookup(&self, username: &str) -> Result<CredentialHash, SessionError> {
        self.users
            .get(username)
            .cloned()
            .ok_or_else(|| SessionError::UnknownUser(username.to_string()))
    }

    /// Fails with [`SessionError::NotRegistered`] for unknown usernames.
    pub fn ensure_registered(&self, username: &str) -> Result<(), SessionError> {
        if self.contains(username) {
            Ok(())
        } else {
            Err(SessionError::NotRegistered(username.to_string()))
        }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(CredentialConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
    }

    fn add(store: &mut CredentialStore, username: &str, credential: &str) {
        let hash = CredentialHash::new(store.config(), credential).unwrap();
        store.insert(username, hash).unwrap();
    }

    // =====================================================================
    // insert() / lookup() / ensure_registered()
    // =====================================================================

    #[test]
    fn test_insert_prehashed_then_lookup_verifies() {
        let mut store = store();
        let hash = CredentialHash::new(store.config(), "pw3").unwrap();

        store.insert("carol", hash).unwrap();

        let stored = store.lookup("carol").unwrap();
        assert!(stored.verify("pw3").unwrap());
    }

    #[test]
    fn test_insert_taken_username_returns_already_exists() {
        let mut store = store();
        add(&mut store, "carol", "pw3");
        let hash = CredentialHash::new(store.config(), "x").unwrap();

        assert!(matches!(
            store.insert("carol", hash),
            Err(SessionError::AlreadyExists(ref u)) if u == "carol"
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_duplicate_never_overwrites() {
        let mut store = store();
        add(&mut store, "alice", "pw1");
        let hijack = CredentialHash::new(store.config(), "hijack").unwrap();
        let _ = store.insert("alice", hijack);

        let stored = store.lookup("alice").unwrap();
        assert!(stored.verify("pw1").unwrap());
        assert!(!stored.verify("hijack").unwrap());
    }

    #[test]
    fn test_lookup_unknown_user_returns_unknown_user() {
        let store = store();

        assert!(matches!(
            store.lookup("ghost"),
            Err(SessionError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_ensure_registered_unknown_returns_not_registered() {
        let mut store = store();
        add(&mut store, "dave", "pw");

        assert!(store.ensure_registered("dave").is_ok());
        assert!(matches!(
            store.ensure_registered("erin"),
            Err(SessionError::NotRegistered(_))
        ));
    }

    #[test]
    fn test_error_codes_match_wire_taxonomy() {
        use roomcast_protocol::ErrorCode;

        assert_eq!(
            SessionError::AlreadyExists("a".into()).code(),
            ErrorCode::AlreadyExists
        );
        assert_eq!(
            SessionError::BadCredential("a".into()).code(),
            ErrorCode::BadCredential
        );
        assert_eq!(
            SessionError::Hashing("boom".into()).code(),
            ErrorCode::Internal
        );
    }
}
