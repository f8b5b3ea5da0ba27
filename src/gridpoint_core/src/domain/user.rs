use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::account_state::{AccountState, StateError};
use crate::domain::email::{Email, EmailError};
use crate::domain::language::{Language, LanguageError};
use crate::domain::password::{Password, PasswordDigest, PasswordError};
use crate::domain::role::{RoleError, UserRole};
use crate::domain::token::{PasswordRecovery, UserInvitation, UserVerification};
use crate::domain::totp::{TotpProjection, UserTotp};

/// Errors raised by entity-level mutations. Each wraps the value type that
/// rejected the input.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Email(#[from] EmailError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Role(#[from] RoleError),
    #[error(transparent)]
    Language(#[from] LanguageError),
}

/// Creation payload, one field per JSON property of the create endpoint.
/// Unrecognized role/language values fall back to the defaults here; the
/// edit payload is stricter.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: Option<Secret<String>>,
    pub role: Option<String>,
    pub language: Option<String>,
}

/// Edit payload. Name and email are always submitted; role, language and
/// password only when changing.
#[derive(Debug, Clone, Deserialize)]
pub struct EditUser {
    pub name: String,
    pub email: String,
    pub password: Option<Secret<String>>,
    pub role: Option<String>,
    pub language: Option<String>,
}

/// A user account: identity, credentials, lifecycle state and the token
/// records it exclusively owns.
///
/// The id is assigned by the repository on first persist; an id of `None`
/// means the entity has not been stored yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: Option<Uuid>,
    name: String,
    email: Email,
    digest: Option<PasswordDigest>,
    role: UserRole,
    language: Language,
    state: AccountState,
    created_at: DateTime<Utc>,
    invitation: Option<UserInvitation>,
    verification: Option<UserVerification>,
    recovery: Option<PasswordRecovery>,
    totp: Vec<UserTotp>,
    // Change markers for the current mutation; consumed by the
    // orchestration layer to decide which notifications to send. Not
    // persisted.
    #[serde(skip)]
    changed_email: bool,
    #[serde(skip)]
    changed_password: bool,
}

impl User {
    /// Builds a new account from a creation payload. Without a password the
    /// account starts invited; with one it starts unverified.
    pub fn create(profile: NewUser, now: DateTime<Utc>) -> Result<Self, UserError> {
        let email = Email::parse(&profile.email)?;
        let role = profile
            .role
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        let language = profile
            .language
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();

        let mut user = Self {
            id: None,
            name: profile.name,
            email,
            digest: None,
            role,
            language,
            state: AccountState::initial(profile.password.is_none()),
            created_at: now,
            invitation: None,
            verification: None,
            recovery: None,
            totp: Vec::new(),
            changed_email: false,
            changed_password: false,
        };

        if let Some(raw) = profile.password {
            user.set_password(&Password::try_from(raw)?)?;
        }
        // The first assignment is not a "change" for notification purposes.
        user.changed_password = false;

        Ok(user)
    }

    /// Applies an edit payload. Unlike creation, unrecognized role or
    /// language values are errors here.
    pub fn apply_edit(&mut self, edit: EditUser) -> Result<(), UserError> {
        self.name = edit.name;
        self.set_email(Email::parse(&edit.email)?)?;

        if let Some(raw) = edit.role {
            self.role = raw.parse::<UserRole>()?;
        }
        if let Some(raw) = edit.language {
            self.language = raw.parse::<Language>()?;
        }
        if let Some(raw) = edit.password {
            self.set_password(&Password::try_from(raw)?)?;
        }
        Ok(())
    }

    /// Stores a new address. A differing address drops the account back to
    /// its unverified counterpart (verified states only; invited accounts
    /// stay invited) and raises the change marker.
    pub fn set_email(&mut self, email: Email) -> Result<(), UserError> {
        if email == self.email {
            return Ok(());
        }
        if self.state.is_verified() {
            self.state = self.state.unverify()?;
        }
        self.email = email;
        self.changed_email = true;
        Ok(())
    }

    /// Hashes and stores the password, recording whether it actually
    /// differs from the previous one (checked by verifying the new
    /// plaintext against the old hash before overwriting).
    pub fn set_password(&mut self, password: &Password) -> Result<(), UserError> {
        let differs = !self.verify_password(password.expose());
        self.digest = Some(PasswordDigest::from_password(password)?);
        if differs {
            self.changed_password = true;
        }
        Ok(())
    }

    /// False when no password is set (invited account) or on mismatch.
    pub fn verify_password(&self, candidate: &str) -> bool {
        match &self.digest {
            Some(digest) => digest.matches(candidate),
            None => false,
        }
    }

    pub fn change_password(&mut self, old: &str, new: &Password) -> Result<(), UserError> {
        if !self.verify_password(old) {
            return Err(PasswordError::Incorrect.into());
        }
        self.set_password(new)
    }

    pub fn block(&mut self) -> Result<(), StateError> {
        self.state = self.state.block()?;
        Ok(())
    }

    pub fn unblock(&mut self) -> Result<(), StateError> {
        self.state = self.state.unblock()?;
        Ok(())
    }

    pub fn verify(&mut self) -> Result<(), StateError> {
        self.state = self.state.verify()?;
        Ok(())
    }

    /// An account is invited while it has no password hash, independently
    /// of the blocked axis of its state.
    pub fn is_invited(&self) -> bool {
        self.digest.is_none()
    }

    pub fn has_2fa(&self) -> bool {
        !self.totp.is_empty()
    }

    /// Tries the code against every owned TOTP credential, accepting the
    /// first non-replayed match and updating that credential's replay
    /// bookkeeping.
    pub fn verify_totp_code(&mut self, code: &str, now: DateTime<Utc>) -> bool {
        self.totp
            .iter_mut()
            .any(|credential| credential.verify_at(code, now))
    }

    pub fn add_totp(&mut self, credential: UserTotp) {
        self.totp.push(credential);
    }

    pub fn remove_totp(&mut self, uuid: Uuid) -> Option<UserTotp> {
        let index = self.totp.iter().position(|c| c.uuid() == uuid)?;
        Some(self.totp.remove(index))
    }

    pub fn totp_credentials(&self) -> &[UserTotp] {
        &self.totp
    }

    pub fn totp_projections(&self) -> Vec<TotpProjection> {
        self.totp.iter().map(UserTotp::projection).collect()
    }

    /// Replaces any live invitation with a fresh one and returns its uuid.
    pub fn issue_invitation(&mut self, now: DateTime<Utc>) -> Uuid {
        let token = UserInvitation::issue(now);
        let uuid = token.uuid();
        self.invitation = Some(token);
        uuid
    }

    pub fn issue_verification(&mut self, now: DateTime<Utc>) -> Uuid {
        let token = UserVerification::issue(now);
        let uuid = token.uuid();
        self.verification = Some(token);
        uuid
    }

    pub fn issue_recovery(&mut self, now: DateTime<Utc>) -> Uuid {
        let token = PasswordRecovery::issue(now);
        let uuid = token.uuid();
        self.recovery = Some(token);
        uuid
    }

    pub fn clear_invitation(&mut self) {
        self.invitation = None;
    }

    pub fn clear_verification(&mut self) {
        self.verification = None;
    }

    pub fn clear_recovery(&mut self) {
        self.recovery = None;
    }

    pub fn invitation(&self) -> Option<&UserInvitation> {
        self.invitation.as_ref()
    }

    pub fn verification(&self) -> Option<&UserVerification> {
        self.verification.as_ref()
    }

    pub fn recovery(&self) -> Option<&PasswordRecovery> {
        self.recovery.as_ref()
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Called by repositories when the entity is first persisted.
    pub fn assign_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn state(&self) -> AccountState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_changed_email(&self) -> bool {
        self.changed_email
    }

    pub fn has_changed_password(&self) -> bool {
        self.changed_password
    }

    /// Returns the email-change marker and resets it. The orchestration
    /// layer consumes the marker once per mutation; leaving it raised
    /// would re-announce the change on every later persist.
    pub fn take_changed_email(&mut self) -> bool {
        std::mem::take(&mut self.changed_email)
    }

    pub fn take_changed_password(&mut self) -> bool {
        std::mem::take(&mut self.changed_password)
    }

    pub fn projection(&self) -> UserProjection {
        UserProjection {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            language: self.language,
            state: self.state.to_string(),
            created_at: self
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, false),
            has_2fa: self.has_2fa(),
        }
    }
}

/// JSON shape of an account as exposed by the API. No credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProjection {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub language: Language,
    pub state: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "has2Fa")]
    pub has_2fa: bool,
}
