use thiserror::Error;

use gridpoint_core::{
    EmailError, MailError, PasswordError, RepositoryError, StateError, TotpError, UserError,
};

/// The unified error surface of the account subsystem. Every variant is an
/// expected, recoverable condition for the API layer to translate into a
/// response; none is fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("invalid email address: {0}")]
    InvalidEmailAddress(String),
    #[error("password must not be empty")]
    InvalidPassword,
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("invalid account state: {0}")]
    InvalidAccountState(String),
    #[error("email address is already taken")]
    ConflictedEmailAddress,
    #[error("TOTP credential name is already taken")]
    ConflictedTotpName,
    #[error("resource not found")]
    ResourceNotFound,
    #[error("resource has expired")]
    ResourceExpired,
    #[error("account is blocked")]
    BlockedAccount,
    #[error("incorrect TOTP code")]
    IncorrectTotpCode,
    #[error("invalid TOTP secret: {0}")]
    InvalidTotpSecret(String),
    #[error("unknown user role: {0}")]
    InvalidUserRole(String),
    #[error("unknown language: {0}")]
    InvalidUserLanguage(String),
    #[error(transparent)]
    MailDelivery(#[from] MailError),
    #[error("storage error: {0}")]
    Repository(String),
}

impl From<EmailError> for AccountError {
    fn from(err: EmailError) -> Self {
        Self::InvalidEmailAddress(err.reason().to_owned())
    }
}

impl From<PasswordError> for AccountError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Empty => Self::InvalidPassword,
            PasswordError::Incorrect => Self::IncorrectPassword,
            PasswordError::Hashing(reason) => Self::Repository(reason),
        }
    }
}

impl From<StateError> for AccountError {
    fn from(err: StateError) -> Self {
        Self::InvalidAccountState(err.to_string())
    }
}

impl From<TotpError> for AccountError {
    fn from(err: TotpError) -> Self {
        Self::InvalidTotpSecret(err.to_string())
    }
}

impl From<UserError> for AccountError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Email(err) => err.into(),
            UserError::Password(err) => err.into(),
            UserError::State(err) => err.into(),
            UserError::Role(err) => Self::InvalidUserRole(err.0),
            UserError::Language(err) => Self::InvalidUserLanguage(err.0),
        }
    }
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        // Flush-time uniqueness violations are equivalent to the pre-check
        // rejections.
        match err {
            RepositoryError::EmailTaken => Self::ConflictedEmailAddress,
            RepositoryError::TotpNameTaken => Self::ConflictedTotpName,
            RepositoryError::NotFound => Self::ResourceNotFound,
            RepositoryError::Unexpected(reason) => Self::Repository(reason),
        }
    }
}
