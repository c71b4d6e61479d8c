use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::format::{deserialize_optional_timestamp, deserialize_timestamp};
use crate::types::{CatId, UserId};

/// A persisted cat record as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cat {
    #[serde(rename = "_id")]
    pub id: CatId,
    pub name: String,
    pub description: String,
    /// The record owner. Set from the authenticated caller on creation.
    #[serde(rename = "user_id")]
    pub owner_id: UserId,
    pub created_on: DateTime<Utc>,
}

/// Create payload. Any client-supplied `_id` or `user_id` is ignored.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCat {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_on: DateTime<Utc>,
}

/// Partial update payload. Absent or `null` fields are left unchanged;
/// identity fields are not part of the type and are dropped on parse.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct CatPatch {
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_on: Option<DateTime<Utc>>,
}

impl CatPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.created_on.is_none()
    }

    /// Merge the supplied fields onto `cat`.
    pub fn apply_to(&self, cat: &mut Cat) {
        if let Some(name) = &self.name {
            cat.name = name.clone();
        }
        if let Some(description) = &self.description {
            cat.description = description.clone();
        }
        if let Some(created_on) = self.created_on {
            cat.created_on = created_on;
        }
    }

    /// Names of the fields this patch writes, for logging.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.created_on.is_some() {
            fields.push("created_on");
        }
        fields
    }
}

/// `GET /cat/` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
}
