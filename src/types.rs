//! Shared identifier types used across the codebase

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a stored cat record. Assigned by the store on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatId(ObjectId);

impl CatId {
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl Default for CatId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectId> for CatId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl FromStr for CatId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
            .map(Self)
            .map_err(|_| format!("'{}' is not a valid record id", s))
    }
}

impl TryFrom<String> for CatId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CatId> for String {
    fn from(id: CatId) -> Self {
        id.0.to_hex()
    }
}

impl fmt::Display for CatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

/// Subject identifier of an authenticated user, as issued by the identity
/// provider. The only authorization boundary on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cat_id_serializes_as_hex_string() {
        let id: CatId = "64b7f0c2a1b2c3d4e5f60718".parse().unwrap();
        assert_eq!(
            serde_json::to_value(id).unwrap(),
            serde_json::json!("64b7f0c2a1b2c3d4e5f60718")
        );
    }

    #[test]
    fn cat_id_rejects_garbage() {
        assert!("not-an-id".parse::<CatId>().is_err());
        assert!(serde_json::from_value::<CatId>(serde_json::json!("123")).is_err());
    }
}
