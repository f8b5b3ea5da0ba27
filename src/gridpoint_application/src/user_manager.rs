use chrono::Utc;
use secrecy::{ExposeSecret, Secret};
use uuid::Uuid;

use gridpoint_core::{
    EditUser, Email, Mail, MailSender, MxLookup, MxResolver, NewUser, Password, User,
    UserRepository,
};

use crate::error::AccountError;
use crate::notify::send_best_effort;

/// Orchestrates the account lifecycle: entity mutation, persistence,
/// uniqueness checks and notification side effects.
///
/// Mail is best-effort for system-initiated notices (create, edit) and
/// propagated for user-initiated ones (recovery request, explicit resend).
pub struct UserManager<R, M, X>
where
    R: UserRepository,
    M: MailSender,
    X: MxResolver,
{
    repository: R,
    mail: M,
    mx: X,
}

impl<R, M, X> UserManager<R, M, X>
where
    R: UserRepository,
    M: MailSender,
    X: MxResolver,
{
    pub fn new(repository: R, mail: M, mx: X) -> Self {
        Self {
            repository,
            mail,
            mx,
        }
    }

    /// Creates an account. Without a password the account is invited and
    /// receives an invitation mail; otherwise it starts unverified and
    /// receives a verification mail. Both mails are best-effort.
    #[tracing::instrument(name = "UserManager::create", skip_all)]
    pub async fn create(&self, payload: NewUser) -> Result<User, AccountError> {
        let email = self.checked_email(&payload.email).await?;
        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(AccountError::ConflictedEmailAddress);
        }

        let now = Utc::now();
        let mut user = User::create(payload, now)?;
        let mail = if user.is_invited() {
            Mail::Invitation {
                token: user.issue_invitation(now),
            }
        } else {
            Mail::Verification {
                token: user.issue_verification(now),
            }
        };

        let user = self.repository.add(user).await?;
        send_best_effort(&self.mail, user.email(), mail).await;
        Ok(user)
    }

    /// Applies an edit. An email change drops the account back to
    /// unverified and triggers a fresh verification mail; a password
    /// change triggers a notice. Both best-effort.
    #[tracing::instrument(name = "UserManager::edit", skip(self, payload))]
    pub async fn edit(&self, id: Uuid, payload: EditUser) -> Result<User, AccountError> {
        let mut user = self.require_user(id).await?;

        let email = self.checked_email(&payload.email).await?;
        if let Some(other) = self.repository.find_by_email(&email).await? {
            if other.id() != user.id() {
                return Err(AccountError::ConflictedEmailAddress);
            }
        }

        let was_admin = user.role().is_admin();
        user.apply_edit(payload)?;
        if was_admin && !user.role().is_admin() && self.repository.count_admins().await? <= 1 {
            return Err(AccountError::InvalidAccountState(
                "cannot demote the last admin".to_owned(),
            ));
        }

        // Consume the markers so a later persist does not re-announce
        // this mutation.
        let changed_password = user.take_changed_password();
        let verification = user.take_changed_email().then(|| Mail::Verification {
            token: user.issue_verification(Utc::now()),
        });

        let user = self.repository.update(user).await?;

        if let Some(mail) = verification {
            send_best_effort(&self.mail, user.email(), mail).await;
        }
        if changed_password {
            send_best_effort(&self.mail, user.email(), Mail::PasswordChanged).await;
        }
        Ok(user)
    }

    /// Removes an account and everything it owns. The last remaining admin
    /// cannot be deleted.
    #[tracing::instrument(name = "UserManager::delete", skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AccountError> {
        let user = self.require_user(id).await?;
        if user.role().is_admin() && self.repository.count_admins().await? <= 1 {
            return Err(AccountError::InvalidAccountState(
                "cannot delete the last admin".to_owned(),
            ));
        }
        self.repository.remove(id).await?;
        Ok(())
    }

    #[tracing::instrument(name = "UserManager::block", skip(self))]
    pub async fn block(&self, id: Uuid) -> Result<User, AccountError> {
        let mut user = self.require_user(id).await?;
        user.block()?;
        Ok(self.repository.update(user).await?)
    }

    #[tracing::instrument(name = "UserManager::unblock", skip(self))]
    pub async fn unblock(&self, id: Uuid) -> Result<User, AccountError> {
        let mut user = self.require_user(id).await?;
        user.unblock()?;
        Ok(self.repository.update(user).await?)
    }

    /// Consumes a verification token. An expired token is replaced and a
    /// fresh mail sent (best-effort) before failing with `ResourceExpired`.
    /// Verification of a blocked account succeeds but still reports
    /// `BlockedAccount`, since sign-in remains refused.
    #[tracing::instrument(name = "UserManager::verify_email", skip_all)]
    pub async fn verify_email(&self, token: Uuid) -> Result<User, AccountError> {
        let Some(mut user) = self.repository.find_by_verification(token).await? else {
            return Err(AccountError::ResourceNotFound);
        };
        if user.state().is_verified() {
            return Err(AccountError::InvalidAccountState(
                "account is already verified".to_owned(),
            ));
        }

        let now = Utc::now();
        if user.verification().map_or(true, |t| t.is_expired(now)) {
            user.clear_verification();
            let fresh = Mail::Verification {
                token: user.issue_verification(now),
            };
            let user = self.repository.update(user).await?;
            send_best_effort(&self.mail, user.email(), fresh).await;
            return Err(AccountError::ResourceExpired);
        }

        user.verify()?;
        user.clear_verification();
        let user = self.repository.update(user).await?;

        if user.state().is_blocked() {
            return Err(AccountError::BlockedAccount);
        }
        Ok(user)
    }

    /// Explicit resend. Replaces the live token and, unlike the implicit
    /// notifications, propagates mail failure to the caller.
    #[tracing::instrument(name = "UserManager::resend_verification", skip(self))]
    pub async fn resend_verification(&self, id: Uuid) -> Result<(), AccountError> {
        let mut user = self.require_user(id).await?;
        if user.state().is_verified() {
            return Err(AccountError::InvalidAccountState(
                "account is already verified".to_owned(),
            ));
        }

        let now = Utc::now();
        let mail = if user.is_invited() {
            Mail::Invitation {
                token: user.issue_invitation(now),
            }
        } else {
            Mail::Verification {
                token: user.issue_verification(now),
            }
        };
        let user = self.repository.update(user).await?;
        self.mail.send(user.email(), &mail).await?;
        Ok(())
    }

    /// Starts password recovery for a verified account, replacing any live
    /// recovery token. Mail failure propagates: the user asked for this
    /// mail and must know it did not go out.
    #[tracing::instrument(name = "UserManager::request_password_recovery", skip_all)]
    pub async fn request_password_recovery(&self, email: &str) -> Result<(), AccountError> {
        let email = Email::parse(email)?;
        let Some(mut user) = self.repository.find_by_email(&email).await? else {
            return Err(AccountError::ResourceNotFound);
        };
        if !user.state().is_verified() {
            return Err(AccountError::InvalidAccountState(
                "account is not verified".to_owned(),
            ));
        }

        let mail = Mail::PasswordRecovery {
            token: user.issue_recovery(Utc::now()),
        };
        let user = self.repository.update(user).await?;
        self.mail.send(user.email(), &mail).await?;
        Ok(())
    }

    /// Consumes a recovery token and sets the new password.
    #[tracing::instrument(name = "UserManager::complete_password_recovery", skip_all)]
    pub async fn complete_password_recovery(
        &self,
        token: Uuid,
        password: Secret<String>,
    ) -> Result<User, AccountError> {
        let Some(mut user) = self.repository.find_by_recovery(token).await? else {
            return Err(AccountError::ResourceNotFound);
        };

        if user.recovery().map_or(true, |t| t.is_expired(Utc::now())) {
            user.clear_recovery();
            self.repository.update(user).await?;
            return Err(AccountError::ResourceExpired);
        }

        let password = Password::try_from(password)?;
        user.set_password(&password)?;
        // Recovery carries no password-changed notice; drop the marker so
        // the next edit does not send one.
        user.take_changed_password();
        user.clear_recovery();
        Ok(self.repository.update(user).await?)
    }

    /// Consumes an invitation token, setting the first password and
    /// verifying the account in one step.
    #[tracing::instrument(name = "UserManager::complete_invitation", skip_all)]
    pub async fn complete_invitation(
        &self,
        token: Uuid,
        password: Secret<String>,
    ) -> Result<User, AccountError> {
        let Some(mut user) = self.repository.find_by_invitation(token).await? else {
            return Err(AccountError::ResourceNotFound);
        };

        if user.invitation().map_or(true, |t| t.is_expired(Utc::now())) {
            user.clear_invitation();
            self.repository.update(user).await?;
            return Err(AccountError::ResourceExpired);
        }

        let password = Password::try_from(password)?;
        user.set_password(&password)?;
        user.take_changed_password();
        user.verify()?;
        user.clear_invitation();
        Ok(self.repository.update(user).await?)
    }

    /// Authenticates credentials. The blocked check runs only after the
    /// credentials pass, so a blocked account gets a "blocked" answer
    /// instead of "invalid credentials". Unknown addresses answer exactly
    /// like wrong passwords to avoid account enumeration.
    #[tracing::instrument(name = "UserManager::sign_in", skip_all)]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &Secret<String>,
        totp_code: Option<&str>,
    ) -> Result<User, AccountError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AccountError::IncorrectPassword);
        };
        let Some(mut user) = self.repository.find_by_email(&email).await? else {
            return Err(AccountError::IncorrectPassword);
        };
        if !user.verify_password(password.expose_secret()) {
            return Err(AccountError::IncorrectPassword);
        }

        if user.has_2fa() {
            let code = totp_code.unwrap_or_default();
            if !user.verify_totp_code(code, Utc::now()) {
                return Err(AccountError::IncorrectTotpCode);
            }
            // Persist the replay bookkeeping before anything else can
            // accept the same code again.
            user = self.repository.update(user).await?;
        }

        if user.state().is_blocked() {
            return Err(AccountError::BlockedAccount);
        }
        Ok(user)
    }

    async fn require_user(&self, id: Uuid) -> Result<User, AccountError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(AccountError::ResourceNotFound)
    }

    /// Parses the address and, when the environment can resolve DNS,
    /// requires the domain to have MX records. The diagnostic text of the
    /// underlying validator is carried into the error.
    async fn checked_email(&self, raw: &str) -> Result<Email, AccountError> {
        let email = Email::parse(raw)?;
        match self.mx.lookup(email.domain()).await {
            MxLookup::NotFound => Err(AccountError::InvalidEmailAddress(format!(
                "domain {} has no MX records",
                email.domain()
            ))),
            MxLookup::Found | MxLookup::Unavailable => Ok(email),
        }
    }
}
