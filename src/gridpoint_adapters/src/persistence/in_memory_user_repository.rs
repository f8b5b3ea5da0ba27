use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use gridpoint_core::{Email, RepositoryError, User, UserRepository};

/// Reference `UserRepository` backed by a shared hash map. Enforces the
/// same unique constraints a relational schema would (email, TOTP name),
/// so flush-time conflicts behave like the real thing in tests.
#[derive(Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn check_unique(
        users: &HashMap<Uuid, User>,
        candidate: &User,
    ) -> Result<(), RepositoryError> {
        for user in users.values() {
            if user.id() == candidate.id() {
                continue;
            }
            if user.email() == candidate.email() {
                return Err(RepositoryError::EmailTaken);
            }
            for theirs in user.totp_credentials() {
                if candidate
                    .totp_credentials()
                    .iter()
                    .any(|ours| ours.name() == theirs.name())
                {
                    return Err(RepositoryError::TotpNameTaken);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn add(&self, mut user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        user.assign_id(Uuid::new_v4());
        Self::check_unique(&users, &user)?;
        let id = user.id().ok_or_else(|| {
            RepositoryError::Unexpected("id missing after assignment".to_owned())
        })?;
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        let id = user.id().ok_or(RepositoryError::NotFound)?;
        if !users.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        Self::check_unique(&users, &user)?;
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn remove(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.remove(&id).ok_or(RepositoryError::NotFound)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email() == email).cloned())
    }

    async fn find_by_invitation(&self, token: Uuid) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.invitation().map(|t| t.uuid()) == Some(token))
            .cloned())
    }

    async fn find_by_verification(&self, token: Uuid) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.verification().map(|t| t.uuid()) == Some(token))
            .cloned())
    }

    async fn find_by_recovery(&self, token: Uuid) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.recovery().map(|t| t.uuid()) == Some(token))
            .cloned())
    }

    async fn count_admins(&self) -> Result<usize, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| u.role().is_admin()).count())
    }

    async fn totp_name_taken(&self, name: &str) -> Result<bool, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .any(|u| u.totp_credentials().iter().any(|t| t.name() == name)))
    }
}
