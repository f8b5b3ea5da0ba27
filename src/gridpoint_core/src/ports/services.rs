use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::email::Email;

/// A templated notification with its parameters. Rendering and transport
/// are up to the adapter; the core only names the template and supplies
/// what it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mail {
    Invitation { token: Uuid },
    Verification { token: Uuid },
    PasswordRecovery { token: Uuid },
    PasswordChanged,
    TotpAdded { name: String },
}

impl Mail {
    pub fn template(&self) -> &'static str {
        match self {
            Self::Invitation { .. } => "user-invitation",
            Self::Verification { .. } => "user-verification",
            Self::PasswordRecovery { .. } => "password-recovery",
            Self::PasswordChanged => "password-changed",
            Self::TotpAdded { .. } => "totp-added",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Port trait for the mail delivery service.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, recipient: &Email, mail: &Mail) -> Result<(), MailError>;
}

/// Outcome of an MX lookup. `Unavailable` means the runtime environment
/// has no DNS resolution; callers treat it as a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MxLookup {
    Found,
    NotFound,
    Unavailable,
}

/// Port trait for MX-record lookups used by e-mail validation.
#[async_trait]
pub trait MxResolver: Send + Sync {
    async fn lookup(&self, domain: &str) -> MxLookup;
}
