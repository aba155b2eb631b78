//! Password policy, hashing and reset tokens.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine as _, engine::general_purpose};
use rand::Rng;
use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters long")]
    TooShort,

    #[error("password must contain {0}")]
    MissingCharacterClass(&'static str),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Enforce the console password policy.
///
/// At least eight characters with one uppercase letter, one lowercase letter,
/// one digit and one non-alphanumeric character.
pub fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }

    let checks: [(fn(char) -> bool, &'static str); 4] = [
        (|c| c.is_uppercase(), "an uppercase letter"),
        (|c| c.is_lowercase(), "a lowercase letter"),
        (|c| c.is_ascii_digit(), "a number"),
        (|c| !c.is_alphanumeric(), "a special character"),
    ];

    for (check, label) in checks {
        if !password.chars().any(check) {
            return Err(PasswordError::MissingCharacterClass(label));
        }
    }
    Ok(())
}

/// Hash with Argon2id default parameters.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify against a stored PHC string. Parameters come from the hash itself.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// 32 random bytes, base64url without padding.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
