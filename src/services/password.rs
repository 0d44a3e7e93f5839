//! Argon2 password hashing for local accounts.

use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, SaltString, rand_core::OsRng,
    },
};

static ARGON2: LazyLock<Argon2<'static>> = LazyLock::new(Argon2::default);

/// Hashes a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = ARGON2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks a password against a stored PHC string.
///
/// A wrong password is `Ok(false)`; a malformed hash is an error.
pub fn verify_password(hash: &str, password: &str) -> Result<bool, PasswordHashError> {
    let parsed_hash = PasswordHash::new(hash)?;
    match ARGON2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
