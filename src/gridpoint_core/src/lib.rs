pub mod domain;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    account_state::{AccountState, StateError},
    email::{Email, EmailError},
    language::{Language, LanguageError},
    password::{Password, PasswordDigest, PasswordError},
    role::{RoleError, UserRole},
    token::{PasswordRecovery, TokenMeta, UserInvitation, UserVerification, TOKEN_TTL_DAYS},
    totp::{TotpError, TotpProjection, UserTotp},
    user::{EditUser, NewUser, User, UserError, UserProjection},
};

pub use ports::{
    repositories::{RepositoryError, UserRepository},
    services::{Mail, MailError, MailSender, MxLookup, MxResolver},
};
