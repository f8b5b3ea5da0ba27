use std::fmt;
use std::str::FromStr;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Syntax failure from the underlying validator; the reason text is carried
/// through to the caller so the API can show why an address was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid email address: {0}")]
pub struct EmailError(String);

impl EmailError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// A syntactically valid e-mail address.
///
/// Only RFC syntax is checked here. Whether the domain actually receives
/// mail (MX records) is an environment concern and lives behind the
/// `MxResolver` port, checked by the orchestration layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        match EmailAddress::from_str(raw) {
            Ok(address) => Ok(Self(address.to_string())),
            Err(err) => Err(EmailError(err.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after the last `@`, used for MX lookups.
    pub fn domain(&self) -> &str {
        self.0.rsplit('@').next().unwrap_or("")
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}
