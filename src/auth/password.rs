//! Argon2id password storage. Stored values are PHC strings.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("could not derive password hash: {0}")]
    Hashing(password_hash::Error),

    #[error("stored password hash is unreadable: {0}")]
    CorruptHash(password_hash::Error),
}

/// Derives a PHC string for `plain` under a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    match Argon2::default().hash_password(plain.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(e) => {
            error!(error = %e, "password hashing failed");
            Err(PasswordError::Hashing(e))
        }
    }
}

/// `Ok(false)` on mismatch. A stored value that is not a PHC string is an
/// error, never a mismatch, so a corrupt row cannot be mistaken for a typo.
pub fn verify_password(plain: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored password hash rejected");
        PasswordError::CorruptHash(e)
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("Secur3P@ssw0rd!").unwrap();
        let b = hash_password("Secur3P@ssw0rd!").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(verify_password("Secur3P@ssw0rd!", &a).unwrap());
        assert!(verify_password("Secur3P@ssw0rd!", &b).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn plaintext_in_store_is_corrupt_not_a_mismatch() {
        let err = verify_password("hunter2", "hunter2").unwrap_err();
        assert!(matches!(err, PasswordError::CorruptHash(_)));
        assert!(err.to_string().starts_with("stored password hash is unreadable"));
    }
}
