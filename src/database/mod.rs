// Storage module
// Document-shaped persistence for users and groups behind one trait

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Group, GroupStatus, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What a user deletion removed besides the user record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub groups_deleted: usize,
    pub groups_updated: usize,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with `DuplicateEmail` when the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Users matching `ids`, in no particular order. Unknown ids are skipped.
    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
    /// Oldest first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn save_user(&self, user: &User) -> StoreResult<()>;
    /// Removes the user, every group they created, and their membership,
    /// messages and materials in the remaining groups. `None` when the user
    /// does not exist.
    async fn delete_user_cascade(&self, id: Uuid) -> StoreResult<Option<CascadeSummary>>;

    async fn insert_group(&self, group: &Group) -> StoreResult<()>;
    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>>;
    /// Newest first, optionally restricted to one status.
    async fn list_groups(&self, status: Option<GroupStatus>) -> StoreResult<Vec<Group>>;
    /// Groups whose member list contains `user_id`, newest first.
    async fn groups_with_member(&self, user_id: Uuid) -> StoreResult<Vec<Group>>;
    /// Groups created by `user_id`, newest first.
    async fn groups_created_by(&self, user_id: Uuid) -> StoreResult<Vec<Group>>;
    /// Overwrites the whole group document.
    async fn save_group(&self, group: &Group) -> StoreResult<()>;
    async fn delete_group(&self, id: Uuid) -> StoreResult<bool>;
}
