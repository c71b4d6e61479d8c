use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api::{Cat, CatPatch};
use crate::types::{CatId, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Database timed out during {0}")]
    Timeout(&'static str),

    #[error("Malformed stored document: {0}")]
    Malformed(String),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

/// A record about to be inserted. The store assigns the id.
#[derive(Debug, Clone)]
pub struct CatDraft {
    pub name: String,
    pub description: String,
    pub owner_id: UserId,
    pub created_on: DateTime<Utc>,
}

/// Storage port for cat records.
///
/// The resource layer only talks to this trait; ownership rules live above it.
#[async_trait]
pub trait CatStore: Send + Sync {
    /// Records owned by `owner` with `start <= created_on <= end`, in store order.
    async fn find_by_owner(
        &self,
        owner: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Cat>, StoreError>;

    async fn insert(&self, draft: CatDraft) -> Result<Cat, StoreError>;

    async fn get(&self, id: CatId) -> Result<Option<Cat>, StoreError>;

    /// Apply every field of `patch` in one write and return the stored
    /// record afterwards, or `None` if it no longer exists.
    async fn update(&self, id: CatId, patch: &CatPatch) -> Result<Option<Cat>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: CatId) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
