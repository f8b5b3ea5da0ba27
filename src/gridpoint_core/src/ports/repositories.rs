use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::email::Email;
use crate::domain::user::User;

/// UserRepository port errors. Uniqueness violations surfaced at flush time
/// map onto the same variants as the orchestration layer's pre-checks.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("email address is already taken")]
    EmailTaken,
    #[error("TOTP credential name is already taken")]
    TotpNameTaken,
    #[error("user not found")]
    NotFound,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl PartialEq for RepositoryError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::EmailTaken, Self::EmailTaken) => true,
            (Self::TotpNameTaken, Self::TotpNameTaken) => true,
            (Self::NotFound, Self::NotFound) => true,
            (Self::Unexpected(_), Self::Unexpected(_)) => true,
            _ => false,
        }
    }
}

/// Transactional persistence for the user aggregate. Token records and
/// TOTP credentials travel with the owning user; the `find_by_*` token
/// lookups resolve the token's back-reference.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a new user, assigning its id. Fails with `EmailTaken` when
    /// the address is already in use.
    async fn add(&self, user: User) -> Result<User, RepositoryError>;

    /// Persists changes to an existing user, re-checking unique fields.
    async fn update(&self, user: User) -> Result<User, RepositoryError>;

    /// Removes a user and everything it owns.
    async fn remove(&self, id: Uuid) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn find_by_invitation(&self, token: Uuid) -> Result<Option<User>, RepositoryError>;

    async fn find_by_verification(&self, token: Uuid) -> Result<Option<User>, RepositoryError>;

    async fn find_by_recovery(&self, token: Uuid) -> Result<Option<User>, RepositoryError>;

    async fn count_admins(&self) -> Result<usize, RepositoryError>;

    /// TOTP credential names are unique across the whole system.
    async fn totp_name_taken(&self, name: &str) -> Result<bool, RepositoryError>;
}
