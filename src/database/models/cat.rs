use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::format::truncate_to_millis;
use crate::api::{Cat, CatPatch};
use crate::database::repository::{CatDraft, StoreError};
use crate::types::CatId;

pub const COLLECTION: &str = "cats";

/// Stored shape of a cat record in the `cats` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    /// Owner subject, stored in its hyphenated string form.
    pub user_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_on: DateTime<Utc>,
}

impl CatDocument {
    /// The document exactly as it will be stored; `created_on` is cut to
    /// the millisecond precision of a BSON datetime.
    pub fn from_draft(draft: CatDraft) -> Self {
        Self {
            id: ObjectId::new(),
            name: draft.name,
            description: draft.description,
            user_id: draft.owner_id.to_string(),
            created_on: truncate_to_millis(draft.created_on),
        }
    }

    pub fn into_cat(self) -> Result<Cat, StoreError> {
        let owner_id = self.user_id.parse().map_err(|_| {
            StoreError::Malformed(format!(
                "cat {} has non-uuid user_id '{}'",
                self.id.to_hex(),
                self.user_id
            ))
        })?;

        Ok(Cat {
            id: CatId::from(self.id),
            name: self.name,
            description: self.description,
            owner_id,
            created_on: self.created_on,
        })
    }
}

/// `$set` body for the fields present in `patch`.
pub fn patch_to_set(patch: &CatPatch) -> Document {
    let mut set = Document::new();
    if let Some(name) = &patch.name {
        set.insert("name", name.as_str());
    }
    if let Some(description) = &patch.description {
        set.insert("description", description.as_str());
    }
    if let Some(created_on) = patch.created_on {
        set.insert("created_on", bson::DateTime::from_chrono(created_on));
    }
    doc! { "$set": set }
}
