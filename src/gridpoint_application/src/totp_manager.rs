use chrono::Utc;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use uuid::Uuid;

use gridpoint_core::{Mail, MailSender, TotpProjection, User, UserRepository, UserTotp};

use crate::error::AccountError;
use crate::notify::send_best_effort;

/// Registration payload for a new TOTP credential. The code proves the
/// caller actually enrolled the secret in an authenticator; the password
/// re-authenticates the session issuing the request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTotp {
    pub name: String,
    pub secret: String,
    pub code: String,
    pub password: Secret<String>,
}

/// Manages the TOTP credentials of an account. Every mutation requires a
/// fresh password and a currently valid code, never the session alone.
pub struct TotpManager<R, M>
where
    R: UserRepository,
    M: MailSender,
{
    repository: R,
    mail: M,
}

impl<R, M> TotpManager<R, M>
where
    R: UserRepository,
    M: MailSender,
{
    pub fn new(repository: R, mail: M) -> Self {
        Self { repository, mail }
    }

    /// Registers a credential. The submitted code is checked against the
    /// new secret first, so a mistyped enrollment fails before the password
    /// is even looked at. A notification goes out best-effort.
    #[tracing::instrument(name = "TotpManager::add", skip(self, payload))]
    pub async fn add(&self, user_id: Uuid, payload: NewTotp) -> Result<User, AccountError> {
        let mut user = self.require_user(user_id).await?;

        let now = Utc::now();
        let mut credential = UserTotp::new(payload.name, &payload.secret, now)?;
        if !credential.verify_at(&payload.code, now) {
            return Err(AccountError::IncorrectTotpCode);
        }
        if !user.verify_password(payload.password.expose_secret()) {
            return Err(AccountError::IncorrectPassword);
        }
        if self.repository.totp_name_taken(credential.name()).await? {
            return Err(AccountError::ConflictedTotpName);
        }

        let name = credential.name().to_owned();
        user.add_totp(credential);
        let user = self.repository.update(user).await?;
        send_best_effort(&self.mail, user.email(), Mail::TotpAdded { name }).await;
        Ok(user)
    }

    /// Removes a credential. The code may come from any of the account's
    /// remaining authenticators.
    #[tracing::instrument(name = "TotpManager::remove", skip(self, password, code))]
    pub async fn remove(
        &self,
        user_id: Uuid,
        credential: Uuid,
        password: &Secret<String>,
        code: &str,
    ) -> Result<User, AccountError> {
        let mut user = self.require_user(user_id).await?;
        if !user
            .totp_credentials()
            .iter()
            .any(|c| c.uuid() == credential)
        {
            return Err(AccountError::ResourceNotFound);
        }
        if !user.verify_password(password.expose_secret()) {
            return Err(AccountError::IncorrectPassword);
        }
        if !user.verify_totp_code(code, Utc::now()) {
            return Err(AccountError::IncorrectTotpCode);
        }

        user.remove_totp(credential);
        Ok(self.repository.update(user).await?)
    }

    /// Lists the account's credentials without their secrets.
    #[tracing::instrument(name = "TotpManager::list", skip(self))]
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<TotpProjection>, AccountError> {
        let user = self.require_user(user_id).await?;
        Ok(user.totp_projections())
    }

    async fn require_user(&self, id: Uuid) -> Result<User, AccountError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(AccountError::ResourceNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridpoint_adapters::{InMemoryUserRepository, RecordingMailSender};
    use gridpoint_core::domain::totp::{TOTP_DIGITS, TOTP_SKEW_STEPS, TOTP_STEP_SECONDS};
    use gridpoint_core::NewUser;

    fn manager() -> (
        TotpManager<InMemoryUserRepository, RecordingMailSender>,
        InMemoryUserRepository,
        RecordingMailSender,
    ) {
        let repository = InMemoryUserRepository::new();
        let mail = RecordingMailSender::new();
        let manager = TotpManager::new(repository.clone(), mail.clone());
        (manager, repository, mail)
    }

    async fn stored_user(repository: &InMemoryUserRepository, email: &str, password: &str) -> User {
        let user = User::create(
            NewUser {
                name: "Operator".to_owned(),
                email: email.to_owned(),
                password: Some(Secret::new(password.to_owned())),
                role: None,
                language: None,
            },
            Utc::now(),
        )
        .unwrap();
        repository.add(user).await.unwrap()
    }

    fn generated_secret() -> String {
        totp_rs::Secret::generate_secret().to_encoded().to_string()
    }

    fn code_for(secret: &str) -> String {
        let bytes = totp_rs::Secret::Encoded(secret.to_owned())
            .to_bytes()
            .unwrap();
        totp_rs::TOTP::new(
            totp_rs::Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW_STEPS,
            TOTP_STEP_SECONDS,
            bytes,
            None,
            "test".to_owned(),
        )
        .unwrap()
        .generate_current()
        .unwrap()
    }

    fn payload(secret: &str, password: &str) -> NewTotp {
        NewTotp {
            name: "Phone".to_owned(),
            secret: secret.to_owned(),
            code: code_for(secret),
            password: Secret::new(password.to_owned()),
        }
    }

    #[tokio::test]
    async fn add_registers_and_notifies() {
        let (manager, repository, mail) = manager();
        let user = stored_user(&repository, "op@plant.example", "pw").await;
        let secret = generated_secret();

        let updated = manager
            .add(user.id().unwrap(), payload(&secret, "pw"))
            .await
            .unwrap();

        assert!(updated.has_2fa());
        assert_eq!(
            mail.sent_to(updated.email()).await,
            vec![Mail::TotpAdded {
                name: "Phone".to_owned()
            }]
        );
    }

    #[tokio::test]
    async fn add_checks_the_code_before_the_password() {
        let (manager, repository, _) = manager();
        let user = stored_user(&repository, "op@plant.example", "pw").await;

        let mut bad = payload(&generated_secret(), "wrong-password");
        bad.code = "000000".to_owned();
        let err = manager.add(user.id().unwrap(), bad).await.unwrap_err();
        assert_eq!(err, AccountError::IncorrectTotpCode);
    }

    #[tokio::test]
    async fn add_rejects_a_wrong_password() {
        let (manager, repository, _) = manager();
        let user = stored_user(&repository, "op@plant.example", "pw").await;

        let err = manager
            .add(user.id().unwrap(), payload(&generated_secret(), "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err, AccountError::IncorrectPassword);
    }

    #[tokio::test]
    async fn add_rejects_an_invalid_secret() {
        let (manager, repository, _) = manager();
        let user = stored_user(&repository, "op@plant.example", "pw").await;

        let err = manager
            .add(
                user.id().unwrap(),
                NewTotp {
                    name: "Phone".to_owned(),
                    secret: "1!".to_owned(),
                    code: "000000".to_owned(),
                    password: Secret::new("pw".to_owned()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidTotpSecret(_)));
    }

    #[tokio::test]
    async fn credential_names_are_unique_across_accounts() {
        let (manager, repository, _) = manager();
        let alice = stored_user(&repository, "alice@plant.example", "pw").await;
        let bob = stored_user(&repository, "bob@plant.example", "pw").await;

        manager
            .add(alice.id().unwrap(), payload(&generated_secret(), "pw"))
            .await
            .unwrap();
        let err = manager
            .add(bob.id().unwrap(), payload(&generated_secret(), "pw"))
            .await
            .unwrap_err();
        assert_eq!(err, AccountError::ConflictedTotpName);
    }

    #[tokio::test]
    async fn remove_requires_password_and_code() {
        let (manager, repository, _) = manager();
        let user = stored_user(&repository, "op@plant.example", "pw").await;
        let secret = generated_secret();
        let updated = manager
            .add(user.id().unwrap(), payload(&secret, "pw"))
            .await
            .unwrap();
        let credential = updated.totp_credentials()[0].uuid();

        let err = manager
            .remove(
                user.id().unwrap(),
                credential,
                &Secret::new("wrong".to_owned()),
                &code_for(&secret),
            )
            .await
            .unwrap_err();
        assert_eq!(err, AccountError::IncorrectPassword);

        let err = manager
            .remove(
                user.id().unwrap(),
                credential,
                &Secret::new("pw".to_owned()),
                "000000",
            )
            .await
            .unwrap_err();
        assert_eq!(err, AccountError::IncorrectTotpCode);
    }

    #[tokio::test]
    async fn remove_deletes_the_credential() {
        let (manager, repository, _) = manager();
        let user = stored_user(&repository, "op@plant.example", "pw").await;
        let secret = generated_secret();
        let updated = manager
            .add(user.id().unwrap(), payload(&secret, "pw"))
            .await
            .unwrap();
        let credential = updated.totp_credentials()[0].uuid();

        // Enrollment consumed the current code of the first secret, and the
        // leeway window rejects same-step codes as replays. Store a second
        // authenticator with no use on record and remove with its code.
        let other_secret = generated_secret();
        let mut stored = repository
            .find_by_id(user.id().unwrap())
            .await
            .unwrap()
            .unwrap();
        stored.add_totp(UserTotp::new("Tablet", &other_secret, Utc::now()).unwrap());
        repository.update(stored).await.unwrap();

        let after = manager
            .remove(
                user.id().unwrap(),
                credential,
                &Secret::new("pw".to_owned()),
                &code_for(&other_secret),
            )
            .await
            .unwrap();
        assert_eq!(after.totp_credentials().len(), 1);
        assert_eq!(after.totp_credentials()[0].name(), "Tablet");
    }

    #[tokio::test]
    async fn removing_an_unknown_credential_is_not_found() {
        let (manager, repository, _) = manager();
        let user = stored_user(&repository, "op@plant.example", "pw").await;

        let err = manager
            .remove(
                user.id().unwrap(),
                Uuid::new_v4(),
                &Secret::new("pw".to_owned()),
                "000000",
            )
            .await
            .unwrap_err();
        assert_eq!(err, AccountError::ResourceNotFound);
    }

    #[tokio::test]
    async fn list_exposes_projections_only() {
        let (manager, repository, _) = manager();
        let user = stored_user(&repository, "op@plant.example", "pw").await;
        manager
            .add(user.id().unwrap(), payload(&generated_secret(), "pw"))
            .await
            .unwrap();

        let listed = manager.list(user.id().unwrap()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Phone");
        assert!(listed[0].last_used_at.is_some());
    }
}
