#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use cattery_api::auth::{AccessTokenInfo, AuthError, IdentityProvider, UserInfo};
use cattery_api::config::Settings;
use cattery_api::database::InMemoryCatStore;
use cattery_api::services::CatService;
use cattery_api::types::UserId;
use cattery_api::AppState;

pub const ALICE_TOKEN: &str = "alice-token";
pub const BOB_TOKEN: &str = "bob-token";

/// Identity provider that recognises a fixed set of opaque tokens.
pub struct StaticIdentityProvider {
    users: HashMap<String, UserId>,
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(&self, access_token: &str) -> Result<AccessTokenInfo, AuthError> {
        let id = self
            .users
            .get(access_token)
            .copied()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".into()))?;

        Ok(AccessTokenInfo {
            id,
            scope: vec!["openid".into(), "offline_access".into()],
            permissions: vec![],
            access_token: access_token.to_string(),
        })
    }

    async fn userinfo(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let info = self.authenticate(access_token).await?;
        let mut claims = UserInfo::new();
        claims.insert("sub".into(), json!(info.id.to_string()));
        claims.insert(
            "email".into(),
            json!(format!("{}@example.com", access_token.trim_end_matches("-token"))),
        );
        Ok(claims)
    }
}

pub fn test_settings() -> Settings {
    let env: HashMap<&str, &str> = HashMap::from([
        ("APP_NAME", "Cattery"),
        ("APP_VERSION", "0.1.0-test"),
        ("DATABASE_URI", "mongodb://localhost:27017/cattery-test"),
        ("ENVIRONMENT", "TESTING"),
        ("CLIENT_ORIGIN", "http://localhost:5173"),
        ("CLIENT_ID", "test-client"),
        ("CLIENT_SECRET", "test-secret"),
        ("FIEF_URL", "http://localhost:8001"),
        ("AUTHORIZE_URL", "http://localhost:8001/authorize"),
        ("TOKEN_URL", "http://localhost:8001/api/token"),
    ]);
    Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()))
        .expect("test settings must be valid")
}

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub alice: UserId,
    pub bob: UserId,
    pub store: Arc<InMemoryCatStore>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub fn put(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token)
    }

    pub fn delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }
}

/// Serve the real router on a free local port, backed by an in-memory store
/// and a static identity provider.
pub async fn spawn_server() -> Result<TestServer> {
    let alice = UserId(Uuid::new_v4());
    let bob = UserId(Uuid::new_v4());
    let identity = StaticIdentityProvider {
        users: HashMap::from([
            (ALICE_TOKEN.to_string(), alice),
            (BOB_TOKEN.to_string(), bob),
        ]),
    };

    let settings = test_settings();
    let store = Arc::new(InMemoryCatStore::new());
    let state = AppState {
        cats: CatService::new(store.clone(), settings.reference_offset),
        identity: Arc::new(identity),
        settings: Arc::new(settings),
    };

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, cattery_api::app(state)).await;
    });

    Ok(TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        alice,
        bob,
        store,
    })
}
