use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::repository::{CatDraft, CatStore, StoreError};
use crate::api::format::truncate_to_millis;
use crate::api::{Cat, CatPatch};
use crate::types::{CatId, UserId};

/// Process-local cat store keeping records in insertion order.
///
/// Timestamps are kept at millisecond precision, like the MongoDB store.
#[derive(Default)]
pub struct InMemoryCatStore {
    cats: RwLock<Vec<Cat>>,
}

impl InMemoryCatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.cats.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cats.read().await.is_empty()
    }
}

#[async_trait]
impl CatStore for InMemoryCatStore {
    async fn find_by_owner(
        &self,
        owner: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Cat>, StoreError> {
        let cats = self.cats.read().await;
        Ok(cats
            .iter()
            .filter(|cat| cat.owner_id == owner)
            .filter(|cat| start <= cat.created_on && cat.created_on <= end)
            .cloned()
            .collect())
    }

    async fn insert(&self, draft: CatDraft) -> Result<Cat, StoreError> {
        let cat = Cat {
            id: CatId::new(),
            name: draft.name,
            description: draft.description,
            owner_id: draft.owner_id,
            created_on: truncate_to_millis(draft.created_on),
        };
        self.cats.write().await.push(cat.clone());
        Ok(cat)
    }

    async fn get(&self, id: CatId) -> Result<Option<Cat>, StoreError> {
        let cats = self.cats.read().await;
        Ok(cats.iter().find(|cat| cat.id == id).cloned())
    }

    async fn update(&self, id: CatId, patch: &CatPatch) -> Result<Option<Cat>, StoreError> {
        let mut cats = self.cats.write().await;
        Ok(cats.iter_mut().find(|cat| cat.id == id).map(|cat| {
            patch.apply_to(cat);
            cat.created_on = truncate_to_millis(cat.created_on);
            cat.clone()
        }))
    }

    async fn delete(&self, id: CatId) -> Result<bool, StoreError> {
        let mut cats = self.cats.write().await;
        let before = cats.len();
        cats.retain(|cat| cat.id != id);
        Ok(cats.len() != before)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
