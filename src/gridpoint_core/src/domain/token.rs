use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All single-use tokens expire this many days after creation.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Identity and timestamp shared by every single-use token record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    uuid: Uuid,
    created_at: DateTime<Utc>,
}

impl TokenMeta {
    fn issue(now: DateTime<Utc>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            created_at: now,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.created_at + Duration::days(TOKEN_TTL_DAYS)
    }
}

/// Single-use token allowing a password-less account to set its first
/// password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInvitation {
    meta: TokenMeta,
}

impl UserInvitation {
    pub fn issue(now: DateTime<Utc>) -> Self {
        Self {
            meta: TokenMeta::issue(now),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.meta.uuid
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.meta.created_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.meta.is_expired(now)
    }
}

/// Single-use token confirming ownership of an e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVerification {
    meta: TokenMeta,
}

impl UserVerification {
    pub fn issue(now: DateTime<Utc>) -> Self {
        Self {
            meta: TokenMeta::issue(now),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.meta.uuid
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.meta.created_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.meta.is_expired(now)
    }
}

/// Single-use token allowing password reset for a verified account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordRecovery {
    meta: TokenMeta,
}

impl PasswordRecovery {
    pub fn issue(now: DateTime<Utc>) -> Self {
        Self {
            meta: TokenMeta::issue(now),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.meta.uuid
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.meta.created_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.meta.is_expired(now)
    }
}
