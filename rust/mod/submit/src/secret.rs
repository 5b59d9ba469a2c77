//! Secret hashing (argon2id, PHC string format).

use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Hash a plain secret with argon2id and a fresh random salt.
pub fn hash_secret(secret: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| e.to_string())
}

/// Verify a plain secret against an argon2id hash.
///
/// Inspection helper: the request path only hashes. Tests and operators use
/// this to check a stored record against a known secret.
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_secret("p1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_secret("p1", &hash));
        assert!(!verify_secret("p2", &hash));
    }

    #[test]
    fn same_secret_hashes_differently() {
        assert_ne!(hash_secret("p1").unwrap(), hash_secret("p1").unwrap());
    }

    #[test]
    fn invalid_hash_never_verifies() {
        assert!(!verify_secret("p1", "p1"));
        assert!(!verify_secret("p1", ""));
    }
}
