//! Salted credential hashes (Argon2id, PHC string format).

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::{CredentialConfig, SessionError};

/// A stored credential: an Argon2id PHC string with its own random salt.
///
/// Hashing is slow; the hub computes and checks these outside its lock.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Hashes `credential` with a fresh random salt.
    ///
    /// # Errors
    /// Returns [`SessionError::Hashing`] if `config` holds parameters
    /// Argon2 rejects.
    pub fn new(
        config: &CredentialConfig,
        credential: &str,
    ) -> Result<Self, SessionError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| SessionError::Hashing(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);

        argon2
            .hash_password(credential.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
            .map_err(|e| SessionError::Hashing(e.to_string()))
    }

    /// Checks `credential` against this hash.
    ///
    /// Returns `Ok(false)` on a mismatch; `Err` only if the stored hash
    /// itself is unreadable.
    pub fn verify(&self, credential: &str) -> Result<bool, SessionError> {
        let parsed = PasswordHash::new(&self.0)
            .map_err(|e| SessionError::Hashing(e.to_string()))?;

        match Argon2::default().verify_password(credential.as_bytes(), &parsed)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(SessionError::Hashing(e.to_string())),
        }
    }

    /// The PHC string (`$argon2id$v=19$m=...`).
    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

/// Never print the hash itself into logs.
impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialHash(..)")
    }
}
