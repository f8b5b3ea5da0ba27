use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,
    #[error("incorrect password")]
    Incorrect,
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// A validated plaintext password. The only domain rule is non-emptiness;
/// the plaintext stays wrapped in `Secret` so it never hits logs.
#[derive(Debug, Clone)]
pub struct Password(Secret<String>);

impl Password {
    pub fn parse(raw: &str) -> Result<Self, PasswordError> {
        Self::try_from(Secret::from(raw.to_owned()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl TryFrom<Secret<String>> for Password {
    type Error = PasswordError;

    fn try_from(raw: Secret<String>) -> Result<Self, Self::Error> {
        if raw.expose_secret().is_empty() {
            return Err(PasswordError::Empty);
        }
        Ok(Self(raw))
    }
}

/// Salted Argon2id hash in PHC string format, as stored on the user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn from_password(password: &Password) -> Result<Self, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.expose().as_bytes(), &salt)
            .map_err(|err| PasswordError::Hashing(err.to_string()))?;
        Ok(Self(hash.to_string()))
    }

    /// Constant-time verification via the argon2 crate. A malformed stored
    /// hash verifies false rather than erroring; it can only mean corrupted
    /// storage and must never authenticate anyone.
    pub fn matches(&self, candidate: &str) -> bool {
        let Ok(parsed) = argon2::PasswordHash::new(&self.0) else {
            return false;
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_password_is_rejected() {
        assert!(matches!(Password::parse(""), Err(PasswordError::Empty)));
    }

    #[test]
    fn digest_matches_its_own_plaintext() {
        let password = Password::parse("hunter2").unwrap();
        let digest = PasswordDigest::from_password(&password).unwrap();
        assert!(digest.matches("hunter2"));
        assert!(!digest.matches("hunter3"));
    }

    #[test]
    fn hashing_salts_every_digest() {
        let password = Password::parse("same-input").unwrap();
        let first = PasswordDigest::from_password(&password).unwrap();
        let second = PasswordDigest::from_password(&password).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_digest_matches_nothing() {
        let digest = PasswordDigest("not-a-phc-string".to_owned());
        assert!(!digest.matches("anything"));
    }
}
