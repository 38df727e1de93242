//! User accounts and password handling.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::validator::{Validator, is_email};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// Unique id, assigned by the store.
    pub id: u64,
    /// When the user registered.
    pub created_at: Timestamp,
    /// Display name.
    pub name: String,
    /// Unique email address.
    pub email: String,
    /// Argon2 PHC string.
    #[serde(skip)]
    pub password_hash: String,
    /// Whether the account was activated through the emailed token.
    pub activated: bool,
    /// Starts at 1 and increases with every update.
    #[serde(skip)]
    pub version: u32,
}

/// A user about to be stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Initial activation state.
    pub activated: bool,
}

/// Registration request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

impl Registration {
    /// Checks every field of the registration.
    pub fn validate(&self, v: &mut Validator) {
        v.check(!self.name.is_empty(), "name", "must be provided");
        v.check(self.name.len() <= 500, "name", "must not be more than 500 bytes long");

        validate_email(v, &self.email);
        validate_password(v, &self.password);
    }
}

/// Checks an email address.
pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(is_email(email), "email", "must be a valid email address");
}

/// Checks a plaintext password: 8 to 72 bytes.
pub fn validate_password(v: &mut Validator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(password.len() >= 8, "password", "must be at least 8 bytes long");
    v.check(password.len() <= 72, "password", "must not be more than 72 bytes long");
}

/// Hashes a plaintext password with a fresh salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Whether `password` matches the stored `hash`.
pub fn verify_password(hash: &str, password: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
