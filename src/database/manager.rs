use std::time::Duration;

use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::info;

use super::models::cat::{patch_to_set, CatDocument, COLLECTION};
use super::repository::{CatDraft, CatStore, StoreError};
use crate::api::{Cat, CatPatch};
use crate::types::{CatId, UserId};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// MongoDB-backed cat store.
///
/// The driver's client pools connections internally, so this is cheap to
/// clone and safe to share across requests.
#[derive(Clone)]
pub struct MongoCatStore {
    database: Database,
    cats: Collection<CatDocument>,
}

impl MongoCatStore {
    /// Connect using a URI that names a default database, and make sure the
    /// owner/date index exists.
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let client = tokio::time::timeout(CONNECT_TIMEOUT, Client::with_uri_str(uri))
            .await
            .map_err(|_| StoreError::Timeout("connect"))??;

        let database = client
            .default_database()
            .ok_or(StoreError::ConfigMissing("database name in DATABASE_URI"))?;

        let store = Self::from_database(database);

        tokio::time::timeout(CONNECT_TIMEOUT, store.setup_collection())
            .await
            .map_err(|_| StoreError::Timeout("collection setup"))??;

        info!("Connected to MongoDB database: {}", store.database.name());
        Ok(store)
    }

    pub fn from_database(database: Database) -> Self {
        let cats = database.collection(COLLECTION);
        Self { database, cats }
    }

    async fn setup_collection(&self) -> Result<(), StoreError> {
        self.cats
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "created_on": 1 })
                    .build(),
                None,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CatStore for MongoCatStore {
    async fn find_by_owner(
        &self,
        owner: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Cat>, StoreError> {
        let filter = doc! {
            "user_id": owner.to_string(),
            "created_on": {
                "$gte": bson::DateTime::from_chrono(start),
                "$lte": bson::DateTime::from_chrono(end),
            },
        };

        let documents: Vec<CatDocument> = self.cats.find(filter, None).await?.try_collect().await?;
        documents.into_iter().map(CatDocument::into_cat).collect()
    }

    async fn insert(&self, draft: CatDraft) -> Result<Cat, StoreError> {
        let document = CatDocument::from_draft(draft);
        self.cats.insert_one(&document, None).await?;
        document.into_cat()
    }

    async fn get(&self, id: CatId) -> Result<Option<Cat>, StoreError> {
        self.cats
            .find_one(doc! { "_id": id.object_id() }, None)
            .await?
            .map(CatDocument::into_cat)
            .transpose()
    }

    async fn update(&self, id: CatId, patch: &CatPatch) -> Result<Option<Cat>, StoreError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.cats
            .find_one_and_update(doc! { "_id": id.object_id() }, patch_to_set(patch), options)
            .await?
            .map(CatDocument::into_cat)
            .transpose()
    }

    async fn delete(&self, id: CatId) -> Result<bool, StoreError> {
        let result = self
            .cats
            .delete_one(doc! { "_id": id.object_id() }, None)
            .await?;
        Ok(result.deleted_count == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}
