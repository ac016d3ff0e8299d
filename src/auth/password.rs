//! Password hashing and verification using Argon2
//!
//! Uses argon2id variant with recommended parameters for password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::VeeriveError;

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, VeeriveError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| VeeriveError::Auth(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
///
/// Returns true if the password matches the hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, VeeriveError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| VeeriveError::Auth(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_rejection() {
        let hash = hash_password("tr0ub4dor&3").unwrap();

        // PHC format, argon2id variant
        assert!(hash.starts_with("$argon2id$"));

        assert!(verify_password("tr0ub4dor&3", &hash).unwrap());
        assert!(!verify_password("troubador&3", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ_per_hash() {
        let first = hash_password("same-input").unwrap();
        let second = hash_password("same-input").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("same-input", &first).unwrap());
        assert!(verify_password("same-input", &second).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error_not_mismatch() {
        assert!(verify_password("anything", "plaintext-left-in-db").is_err());
    }
}
