use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::UserRepository;
use crate::domain::User;
use crate::error::{AppError, DatabaseError};

/// In-process user store used by tests and local runs without Postgres
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;

        let email_taken = users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email));
        if email_taken || users.contains_key(&user.id) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            )));
        }

        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn set_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut users = self.users.write().await;

        Ok(users
            .get_mut(&id)
            .map(|user| {
                user.password_reset_token_hash = Some(token_hash.to_string());
                user.password_reset_expires_at = Some(expires_at);
                user.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn increment_token_version(&self, id: Uuid) -> Result<Option<i64>, AppError> {
        let mut users = self.users.write().await;

        Ok(users.get_mut(&id).map(|user| {
            user.token_version += 1;
            user.updated_at = Utc::now();
            user.token_version
        }))
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;

        Ok(users.get_mut(&id).map(|user| {
            user.password_hash = password_hash.to_string();
            user.clear_reset_ticket();
            user.token_version += 1;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn consume_password_reset(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;

        Ok(users
            .values_mut()
            .find(|user| user.reset_ticket_matches(token_hash, now))
            .map(|user| {
                user.password_hash = password_hash.to_string();
                user.clear_reset_ticket();
                user.token_version += 1;
                user.updated_at = now;
                user.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn user(email: &str) -> User {
        User::new("Test User".to_string(), email.to_string(), "hash".to_string())
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = InMemoryUserRepository::new();
        let user = user("a@example.com");
        repo.insert(&user).await.unwrap();

        assert_eq!(repo.find_by_id(user.id).await.unwrap().unwrap().email, "a@example.com");
        assert!(repo.find_by_email("A@EXAMPLE.COM").await.unwrap().is_some());
        assert!(repo.find_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&user("a@example.com")).await.unwrap();

        let err = repo.insert(&user("A@example.com")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Database(DatabaseError::UniqueConstraintViolation(_))
        ));
        assert_eq!(repo.users.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_set_password_reset_only_writes_ticket() {
        let repo = InMemoryUserRepository::new();
        let user = user("a@example.com");
        repo.insert(&user).await.unwrap();
        repo.update_password(user.id, "changed-hash").await.unwrap();

        let expires_at = Utc::now() + Duration::hours(1);
        assert!(repo.set_password_reset(user.id, "ticket", expires_at).await.unwrap());

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "changed-hash");
        assert_eq!(stored.token_version, 1);
        assert_eq!(stored.password_reset_token_hash.as_deref(), Some("ticket"));
        assert_eq!(stored.password_reset_expires_at, Some(expires_at));

        assert!(!repo
            .set_password_reset(Uuid::new_v4(), "ticket", expires_at)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_increment_unknown_user() {
        let repo = InMemoryUserRepository::new();
        assert_eq!(repo.increment_token_version(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let user = user("a@example.com");
        repo.insert(&user).await.unwrap();
        let id = user.id;

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.increment_token_version(id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.token_version, 50);
    }

    #[tokio::test]
    async fn test_consume_password_reset_is_single_use() {
        let repo = InMemoryUserRepository::new();
        let now = Utc::now();
        let mut user = user("a@example.com");
        user.password_reset_token_hash = Some("ticket".to_string());
        user.password_reset_expires_at = Some(now + Duration::hours(1));
        repo.insert(&user).await.unwrap();

        let consumed = repo
            .consume_password_reset("ticket", "new-hash", now)
            .await
            .unwrap()
            .expect("ticket should be live");
        assert_eq!(consumed.password_hash, "new-hash");
        assert_eq!(consumed.token_version, 1);
        assert!(consumed.password_reset_token_hash.is_none());

        let replay = repo.consume_password_reset("ticket", "other", now).await.unwrap();
        assert!(replay.is_none());
    }

    #[tokio::test]
    async fn test_consume_password_reset_respects_expiry() {
        let repo = InMemoryUserRepository::new();
        let now = Utc::now();
        let mut user = user("a@example.com");
        user.password_reset_token_hash = Some("ticket".to_string());
        user.password_reset_expires_at = Some(now - Duration::seconds(1));
        repo.insert(&user).await.unwrap();

        let result = repo.consume_password_reset("ticket", "new-hash", now).await.unwrap();
        assert!(result.is_none());
        assert_eq!(repo.find_by_id(user.id).await.unwrap().unwrap().token_version, 0);
    }
}
