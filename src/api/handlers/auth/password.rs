//! Password hashing.
//!
//! Argon2id with per-password random salts; the stored string carries the
//! parameters, so verification needs no extra configuration. Hashes are
//! one-way by construction and never leave the database layer.

use anyhow::{Context, Result};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;

/// Hash a plaintext password for storage.
///
/// # Errors
///
/// Returns an error if the hasher rejects the input (it does not for any
/// realistic password length).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored hash.
///
/// A hash that fails to parse counts as a verification failure; it is not an
/// error the caller can act on differently.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Parse-only check used by tests and the bootstrap action.
///
/// # Errors
///
/// Returns an error when `stored_hash` is not a PHC-formatted string.
pub fn parse_stored_hash(stored_hash: &str) -> Result<()> {
    PasswordHash::new(stored_hash)
        .map(|_| ())
        .map_err(|err| anyhow::anyhow!(err))
        .context("stored password hash is not PHC-formatted")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() -> Result<()> {
        let hash = hash_password("Admin1234")?;
        assert!(verify_password("Admin1234", &hash));
        assert!(!verify_password("Admin1235", &hash));
        parse_stored_hash(&hash)
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash_password("Admin1234")?;
        let second = hash_password("Admin1234")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("Admin1234", "not-a-phc-string"));
    }
}
