/// Credential store
///
/// The auth flows only see the `UserRepository` trait, so the same logic
/// runs against Postgres in production and an in-process map in tests.
///
/// Every mutation is a single atomic update touching only the columns it
/// owns. `token_version` only moves through `increment_token_version`,
/// `update_password` and `consume_password_reset`, so concurrent callers
/// can never lower it, and issuing a reset ticket can never write back a
/// stale password hash.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::User;
use crate::error::AppError;

pub use memory::InMemoryUserRepository;
pub use postgres::PgUserRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user; duplicate emails fail with a unique-constraint error
    async fn insert(&self, user: &User) -> Result<(), AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Lookup by (already lowercased) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Atomically store a new reset ticket, replacing any previous one.
    /// Only the two ticket columns are written; `false` if the user is gone
    async fn set_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Atomically add one to `token_version`; `None` if the user is gone
    async fn increment_token_version(&self, id: Uuid) -> Result<Option<i64>, AppError>;

    /// Atomically replace the password hash, clear any reset ticket and bump
    /// `token_version`; `None` if the user is gone
    async fn update_password(&self, id: Uuid, password_hash: &str)
        -> Result<Option<User>, AppError>;

    /// Atomically consume the reset ticket whose hash is `token_hash` and whose
    /// expiry is after `now`: store the new hash, clear the ticket and bump
    /// `token_version`. `None` when no live ticket matches.
    async fn consume_password_reset(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError>;
}
