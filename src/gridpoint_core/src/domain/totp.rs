use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};
use uuid::Uuid;

pub const TOTP_DIGITS: usize = 6;
pub const TOTP_STEP_SECONDS: u64 = 30;
/// Accepted drift in 30-second steps on either side of the current step.
pub const TOTP_SKEW_STEPS: u8 = 15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TotpError {
    #[error("TOTP secret must not be empty")]
    EmptySecret,
    #[error("invalid TOTP secret: {0}")]
    InvalidSecret(String),
}

/// A registered TOTP credential: shared secret plus replay bookkeeping.
///
/// The secret is stored base32-encoded, the way authenticator apps exchange
/// it. Codes are RFC 6238 (SHA-1, 6 digits, 30 s step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTotp {
    uuid: Uuid,
    name: String,
    secret: String,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
}

impl UserTotp {
    /// Builds a credential from a base32 secret, rejecting secrets that are
    /// empty or too short to decode into a usable key.
    pub fn new(
        name: impl Into<String>,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, TotpError> {
        let name = name.into();
        if secret.is_empty() {
            return Err(TotpError::EmptySecret);
        }
        // Validate eagerly so a broken secret fails at registration, not at
        // the first sign-in attempt.
        build_totp(secret, &name)?;
        Ok(Self {
            uuid: Uuid::new_v4(),
            name,
            secret: secret.to_owned(),
            created_at: now,
            last_used_at: None,
        })
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    /// Checks `code` against the secret at time `now` with the configured
    /// leeway window.
    ///
    /// A code that also validates at the timestamp of the previous
    /// successful use is treated as replayed and rejected. On first-use
    /// success the credential remembers `now` for the next replay check.
    pub fn verify_at(&mut self, code: &str, now: DateTime<Utc>) -> bool {
        if code.is_empty() {
            return false;
        }
        let Ok(totp) = build_totp(&self.secret, &self.name) else {
            return false;
        };
        if !totp.check(code, unix_time(now)) {
            return false;
        }
        if let Some(last_used) = self.last_used_at {
            if totp.check(code, unix_time(last_used)) {
                return false;
            }
        }
        self.last_used_at = Some(now);
        true
    }

    pub fn projection(&self) -> TotpProjection {
        TotpProjection {
            uuid: self.uuid,
            name: self.name.clone(),
            created_at: self
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, false),
            last_used_at: self
                .last_used_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, false)),
        }
    }
}

/// JSON shape of a TOTP credential as listed to its owner. The secret is
/// deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotpProjection {
    pub uuid: Uuid,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "lastUsedAt")]
    pub last_used_at: Option<String>,
}

fn unix_time(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp()).unwrap_or(0)
}

fn build_totp(secret: &str, account: &str) -> Result<TOTP, TotpError> {
    let bytes = Secret::Encoded(secret.to_owned())
        .to_bytes()
        .map_err(|err| TotpError::InvalidSecret(format!("{err:?}")))?;
    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW_STEPS,
        TOTP_STEP_SECONDS,
        bytes,
        None,
        account.to_owned(),
    )
    .map_err(|err| TotpError::InvalidSecret(format!("{err:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_secret() -> String {
        Secret::generate_secret().to_encoded().to_string()
    }

    fn code_for(secret: &str, at: DateTime<Utc>) -> String {
        let totp = build_totp(secret, "test").unwrap();
        totp.generate(unix_time(at))
    }

    #[test]
    fn accepts_a_current_code_once() {
        let secret = test_secret();
        let now = Utc::now();
        let mut credential = UserTotp::new("Phone", &secret, now).unwrap();
        let code = code_for(&secret, now);

        assert!(credential.verify_at(&code, now));
        assert_eq!(credential.last_used_at(), Some(now));
        // Same code at the same instant is a replay.
        assert!(!credential.verify_at(&code, now));
    }

    #[test]
    fn accepts_a_fresh_code_after_the_window_moves() {
        let secret = test_secret();
        let now = Utc::now();
        let mut credential = UserTotp::new("Phone", &secret, now).unwrap();
        assert!(credential.verify_at(&code_for(&secret, now), now));

        // Far enough that the old timestamp's leeway window cannot reach it.
        let later = now + Duration::seconds(TOTP_STEP_SECONDS as i64 * 40);
        assert!(credential.verify_at(&code_for(&secret, later), later));
        assert_eq!(credential.last_used_at(), Some(later));
    }

    #[test]
    fn rejects_empty_code() {
        let now = Utc::now();
        let mut credential = UserTotp::new("Phone", &test_secret(), now).unwrap();
        assert!(!credential.verify_at("", now));
    }

    #[test]
    fn rejects_wrong_code() {
        let now = Utc::now();
        let mut credential = UserTotp::new("Phone", &test_secret(), now).unwrap();
        assert!(!credential.verify_at("000000", now));
        assert_eq!(credential.last_used_at(), None);
    }

    #[test]
    fn accepts_code_within_leeway() {
        let secret = test_secret();
        let now = Utc::now();
        let mut credential = UserTotp::new("Phone", &secret, now).unwrap();
        let drifted = now - Duration::seconds(TOTP_STEP_SECONDS as i64 * 10);
        assert!(credential.verify_at(&code_for(&secret, drifted), now));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            UserTotp::new("Phone", "", Utc::now()),
            Err(TotpError::EmptySecret)
        ));
    }

    #[test]
    fn undecodable_secret_is_rejected() {
        assert!(matches!(
            UserTotp::new("Phone", "1!", Utc::now()),
            Err(TotpError::InvalidSecret(_))
        ));
    }

    #[test]
    fn projection_omits_the_secret() {
        let credential = UserTotp::new("Phone", &test_secret(), Utc::now()).unwrap();
        let json = serde_json::to_value(credential.projection()).unwrap();
        assert!(json.get("secret").is_none());
        assert_eq!(json["name"], "Phone");
    }
}
