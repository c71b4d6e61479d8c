pub mod fief;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::UserId;

pub use fief::FiefClient;

/// Claims of a verified access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenInfo {
    /// Subject of the token; the authenticated user.
    pub id: UserId,
    pub scope: Vec<String>,
    pub permissions: Vec<String>,
    pub access_token: String,
}

/// Identity claims returned by the provider's userinfo endpoint.
pub type UserInfo = Map<String, Value>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer credentials")]
    MissingCredentials,

    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// External identity provider. Token issuance happens elsewhere; this only
/// verifies what the client presents.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, access_token: &str) -> Result<AccessTokenInfo, AuthError>;

    async fn userinfo(&self, access_token: &str) -> Result<UserInfo, AuthError>;
}
