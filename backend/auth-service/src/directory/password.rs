//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use rand::rngs::OsRng;
use std::sync::OnceLock;

use crate::error::{IdentityError, Result};

/// Hash a password using Argon2id; returns a PHC string for storage
pub fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(IdentityError::Validation("Password must not be empty".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| IdentityError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    Ok(password_hash)
}

/// Constant-time check of `password` against a stored PHC hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| IdentityError::Internal(format!("Invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(IdentityError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

/// Spend one verification when the username is unknown, so a miss costs as
/// much as a wrong password
pub fn verify_against_dummy(password: &str) {
    // hashed with the same parameters as real accounts
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let dummy = DUMMY_HASH.get_or_init(|| hash_password("unknown-account-placeholder").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
}
