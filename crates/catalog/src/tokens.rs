//! Activation and authentication tokens.
//!
//! The plaintext is handed to the user once; only its SHA-256 hash is stored.

use std::{fmt, time::Duration};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::validator::Validator;

/// Length of an encoded token: 16 random bytes in unpadded base64.
pub const TOKEN_LENGTH: usize = 22;

/// SHA-256 of a token plaintext.
pub type TokenHash = [u8; 32];

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// One-time account activation.
    Activation,
    /// Bearer authentication.
    Authentication,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Activation => f.write_str("activation"),
            Scope::Authentication => f.write_str("authentication"),
        }
    }
}

/// A freshly generated token.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    /// The secret handed to the user.
    #[serde(rename = "token")]
    pub plaintext: String,
    /// Hash of the plaintext, the only form that is stored.
    #[serde(skip)]
    pub hash: TokenHash,
    /// Owner.
    #[serde(skip)]
    pub user_id: u64,
    /// After this instant the token is no longer accepted.
    pub expiry: Timestamp,
    /// Intended use.
    #[serde(skip)]
    pub scope: Scope,
}

impl Token {
    /// Generates a random token for `user_id`, valid for `ttl`.
    pub fn generate(user_id: u64, ttl: Duration, scope: Scope) -> anyhow::Result<Self> {
        let bytes: [u8; 16] = rand::random();
        let plaintext = URL_SAFE_NO_PAD.encode(bytes);

        let expiry = Timestamp::now()
            .checked_add(ttl)
            .map_err(|e| anyhow::anyhow!("Token lifetime of {ttl:?} is out of range: {e}"))?;

        Ok(Self {
            hash: hash(&plaintext),
            plaintext,
            user_id,
            expiry,
            scope,
        })
    }
}

/// Hashes a token plaintext for lookup.
pub fn hash(plaintext: &str) -> TokenHash {
    Sha256::digest(plaintext.as_bytes()).into()
}

/// Checks the shape of a token plaintext supplied by a client.
pub fn validate_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(plaintext.len() == TOKEN_LENGTH, "token", "must be 22 bytes long");
}

/// Activation request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Activation {
    /// Token from the welcome email.
    pub token: String,
}

/// Authentication request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens() {
        let ttl = Duration::from_secs(3600);
        let token = Token::generate(42, ttl, Scope::Authentication).unwrap();
        let other = Token::generate(42, ttl, Scope::Authentication).unwrap();

        assert_eq!(token.plaintext.len(), TOKEN_LENGTH);
        assert_ne!(token.plaintext, other.plaintext);
        assert_eq!(token.hash, hash(&token.plaintext));
        assert!(token.expiry > Timestamp::now());
        assert_eq!(token.user_id, 42);
    }

    #[test]
    fn only_plaintext_and_expiry_are_serialized() {
        let token = Token::generate(1, Duration::from_secs(60), Scope::Activation).unwrap();
        let value = serde_json::to_value(&token).unwrap();

        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();

        assert_eq!(keys, ["expiry", "token"]);
    }

    #[test]
    fn plaintext_shape() {
        let mut validator = Validator::default();
        validate_plaintext(&mut validator, "too-short");
        assert!(!validator.is_valid());

        let mut validator = Validator::default();
        validate_plaintext(&mut validator, "ABCDEFGHIJKLMNOPQRSTUV");
        assert!(validator.is_valid());
    }
}
