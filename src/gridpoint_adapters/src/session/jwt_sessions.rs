use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use gridpoint_core::{User, UserRepository};

/// Session tokens are valid for 90 minutes from issuance.
pub const SESSION_TTL_MINUTES: i64 = 90;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read key file: {0}")]
    KeyFile(#[from] std::io::Error),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("user has not been persisted")]
    MissingUserId,
}

/// RS256 key pair: the private key stays server-side for signing, the
/// public key verifies incoming tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn from_rsa_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, SessionError> {
        Ok(Self {
            encoding: EncodingKey::from_rsa_pem(private_pem)?,
            decoding: DecodingKey::from_rsa_pem(public_pem)?,
        })
    }

    pub fn from_pem_files(
        private_key_file: &Path,
        public_key_file: &Path,
    ) -> Result<Self, SessionError> {
        let private_pem = std::fs::read(private_key_file)?;
        let public_pem = std::fs::read(public_key_file)?;
        Self::from_rsa_pem(&private_pem, &public_pem)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the authenticated user.
    pub uid: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and authenticates session JWTs, resolving authenticated ids
/// back to users through the repository.
pub struct JwtSessions<R> {
    repository: R,
    keys: SessionKeys,
}

impl<R> JwtSessions<R>
where
    R: UserRepository,
{
    pub fn new(repository: R, keys: SessionKeys) -> Self {
        Self { repository, keys }
    }

    /// Signs a session token for a persisted user. Issued-at is truncated
    /// to whole seconds; expiry is issued-at plus the session TTL.
    pub fn create_jwt(&self, user: &User) -> Result<String, SessionError> {
        let uid = user.id().ok_or(SessionError::MissingUserId)?;
        let iat = Utc::now().timestamp();
        let claims = Claims {
            uid: uid.to_string(),
            iat,
            exp: iat + SESSION_TTL_MINUTES * 60,
        };
        Ok(encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.keys.encoding,
        )?)
    }

    /// Resolves a token to its user, or `None` for any invalid input:
    /// bad signature, elapsed expiry (modulo the library's leeway),
    /// malformed or unknown `uid`. Callers get no diagnostics by design;
    /// the endpoint contract is authenticated-or-anonymous.
    #[tracing::instrument(name = "JwtSessions::authenticate", skip_all)]
    pub async fn authenticate(&self, token: &str) -> Option<User> {
        let validation = Validation::new(Algorithm::RS256);
        let data = decode::<Claims>(token, &self.keys.decoding, &validation).ok()?;
        let uid = Uuid::parse_str(&data.claims.uid).ok()?;
        self.repository.find_by_id(uid).await.ok().flatten()
    }
}
