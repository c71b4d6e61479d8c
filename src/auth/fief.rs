use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use super::{AccessTokenInfo, AuthError, IdentityProvider, UserInfo};
use crate::config::IdentitySettings;

const JWKS_PATH: &str = ".well-known/jwks.json";
const USERINFO_PATH: &str = "api/userinfo";

/// Minimum gap between refetches triggered by an unknown `kid`.
const JWKS_REFRESH_COOLDOWN: Duration = Duration::from_secs(30);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a Fief-compatible OIDC provider.
///
/// Access tokens are verified locally against the provider's JWKS, fetched
/// on first use and refetched when a token names a key the cached set lacks.
/// User info is always fetched live.
pub struct FiefClient {
    http: reqwest::Client,
    base_url: Url,
    jwks: RwLock<Option<CachedKeys>>,
}

struct CachedKeys {
    keys: Arc<JwkSet>,
    // None for a set supplied at construction.
    fetched_at: Option<Instant>,
}

#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: String,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    permissions: Vec<String>,
}

impl FiefClient {
    pub fn new(settings: &IdentitySettings) -> Result<Self, AuthError> {
        let base_url = normalize_base_url(&settings.base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("cattery-api/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            jwks: RwLock::new(None),
        })
    }

    /// Build a client with a pre-loaded key set, skipping the initial fetch.
    pub fn with_jwks(settings: &IdentitySettings, jwks: JwkSet) -> Result<Self, AuthError> {
        let mut client = Self::new(settings)?;
        *client.jwks.get_mut() = Some(CachedKeys {
            keys: Arc::new(jwks),
            fetched_at: None,
        });
        Ok(client)
    }

    async fn jwks(&self) -> Result<Arc<JwkSet>, AuthError> {
        if let Some(cached) = self.jwks.read().await.as_ref() {
            return Ok(cached.keys.clone());
        }

        let mut cache = self.jwks.write().await;
        if let Some(cached) = cache.as_ref() {
            return Ok(cached.keys.clone());
        }
        let keys = Arc::new(self.fetch_jwks().await?);
        *cache = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Some(Instant::now()),
        });
        Ok(keys)
    }

    /// Refetch the key set after a `kid` miss. Returns `None` while the
    /// cooldown since the last fetch is still running.
    async fn refresh_jwks(&self) -> Result<Option<Arc<JwkSet>>, AuthError> {
        let mut cache = self.jwks.write().await;
        let cooling_down = cache
            .as_ref()
            .and_then(|cached| cached.fetched_at)
            .is_some_and(|at| at.elapsed() < JWKS_REFRESH_COOLDOWN);
        if cooling_down {
            return Ok(None);
        }

        let keys = Arc::new(self.fetch_jwks().await?);
        tracing::info!("Refreshed JWKS after unknown signing key");
        *cache = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Some(Instant::now()),
        });
        Ok(Some(keys))
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let url = self.endpoint(JWKS_PATH)?;
        tracing::debug!("Fetching JWKS from {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("JWKS request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "JWKS request returned {}",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::Provider(format!("Invalid JWKS document: {}", e)))
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base_url
            .join(path)
            .map_err(|e| AuthError::Provider(e.to_string()))
    }

    fn verify(
        &self,
        jwks: &JwkSet,
        header: &Header,
        access_token: &str,
    ) -> Result<AccessTokenInfo, AuthError> {
        let jwk = select_key(jwks, header.kid.as_deref())
            .ok_or_else(|| AuthError::InvalidToken("no matching signing key".into()))?;

        if !algorithm_matches_key(jwk, header.alg) {
            return Err(AuthError::InvalidToken(format!(
                "algorithm {:?} does not match the signing key",
                header.alg
            )));
        }

        let key = DecodingKey::from_jwk(jwk)
            .map_err(|e| AuthError::Provider(format!("Unusable JWK: {}", e)))?;

        let mut validation = Validation::new(header.alg);
        validation.validate_aud = false;

        let claims = decode::<AccessClaims>(access_token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;

        let id = claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidToken("subject is not a valid user id".into()))?;

        Ok(AccessTokenInfo {
            id,
            scope: claims
                .scope
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            permissions: claims.permissions,
            access_token: access_token.to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for FiefClient {
    async fn authenticate(&self, access_token: &str) -> Result<AccessTokenInfo, AuthError> {
        let header =
            decode_header(access_token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let mut jwks = self.jwks().await?;
        if select_key(&jwks, header.kid.as_deref()).is_none() {
            if let Some(fresh) = self.refresh_jwks().await? {
                jwks = fresh;
            }
        }

        self.verify(&jwks, &header, access_token)
    }

    async fn userinfo(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let response = self
            .http
            .get(self.endpoint(USERINFO_PATH)?)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("userinfo request failed: {}", e)))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AuthError::InvalidToken("rejected by identity provider".into()))
            }
            status if !status.is_success() => {
                return Err(AuthError::Provider(format!("userinfo returned {}", status)))
            }
            _ => {}
        }

        response
            .json::<UserInfo>()
            .await
            .map_err(|e| AuthError::Provider(format!("Invalid userinfo document: {}", e)))
    }
}

// Url::join drops the last path segment unless the base ends with '/'.
fn normalize_base_url(raw: &str) -> Result<Url, AuthError> {
    let mut url = Url::parse(raw).map_err(|e| AuthError::Provider(e.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn select_key<'a>(jwks: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => jwks.find(kid),
        None if jwks.keys.len() == 1 => jwks.keys.first(),
        None => None,
    }
}

fn algorithm_matches_key(jwk: &Jwk, alg: Algorithm) -> bool {
    use Algorithm::*;

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => {
            matches!(alg, RS256 | RS384 | RS512 | PS256 | PS384 | PS512)
        }
        AlgorithmParameters::EllipticCurve(_) => matches!(alg, ES256 | ES384),
        AlgorithmParameters::OctetKey(_) => matches!(alg, HS256 | HS384 | HS512),
        AlgorithmParameters::OctetKeyPair(_) => matches!(alg, EdDSA),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use jsonwebtoken::{encode, EncodingKey};
    use serde_json::json;
    use uuid::Uuid;

    // "c2VjcmV0" is base64 for "secret".
    fn octet_jwks_json() -> serde_json::Value {
        json!({
            "keys": [{ "kty": "oct", "kid": "test-key", "alg": "HS256", "k": "c2VjcmV0" }]
        })
    }

    fn octet_jwks() -> JwkSet {
        serde_json::from_value(octet_jwks_json()).unwrap()
    }

    fn settings() -> IdentitySettings {
        IdentitySettings {
            client_id: "client".into(),
            client_secret: "secret".into(),
            base_url: "https://auth.example.com/tenant".into(),
            authorize_url: "https://auth.example.com/authorize".into(),
            token_url: "https://auth.example.com/api/token".into(),
        }
    }

    fn local_settings(base_url: &str) -> IdentitySettings {
        IdentitySettings {
            base_url: base_url.to_string(),
            ..settings()
        }
    }

    /// Serve `jwks` as the provider key set; the counter tracks fetches.
    async fn serve_jwks(jwks: serde_json::Value) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/.well-known/jwks.json",
            axum::routing::get(move || {
                let jwks = jwks.clone();
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::Json(jwks)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}", addr), hits)
    }

    fn sign(claims: serde_json::Value, kid: Option<&str>) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(str::to_string);
        encode(&header, &claims, &EncodingKey::from_secret(b"secret")).unwrap()
    }

    fn exp_in(seconds: i64) -> i64 {
        chrono::Utc::now().timestamp() + seconds
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let client = FiefClient::with_jwks(&settings(), octet_jwks()).unwrap();
        let sub = Uuid::new_v4();
        let token = sign(
            json!({
                "sub": sub.to_string(),
                "scope": "openid offline_access",
                "permissions": ["cats:read"],
                "exp": exp_in(3600),
            }),
            Some("test-key"),
        );

        let info = client.authenticate(&token).await.unwrap();
        assert_eq!(info.id.0, sub);
        assert_eq!(info.scope, vec!["openid", "offline_access"]);
        assert_eq!(info.permissions, vec!["cats:read"]);
        assert_eq!(info.access_token, token);
    }

    #[tokio::test]
    async fn single_key_set_works_without_kid() {
        let client = FiefClient::with_jwks(&settings(), octet_jwks()).unwrap();
        let token = sign(
            json!({ "sub": Uuid::new_v4().to_string(), "exp": exp_in(60) }),
            None,
        );
        let info = client.authenticate(&token).await.unwrap();
        assert!(info.scope.is_empty());
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let client = FiefClient::with_jwks(&settings(), octet_jwks()).unwrap();
        let token = sign(
            json!({ "sub": Uuid::new_v4().to_string(), "exp": exp_in(-3600) }),
            Some("test-key"),
        );
        assert!(matches!(
            client.authenticate(&token).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn rejects_wrong_signature() {
        let client = FiefClient::with_jwks(&settings(), octet_jwks()).unwrap();
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("test-key".into());
        let token = encode(
            &header,
            &json!({ "sub": Uuid::new_v4().to_string(), "exp": exp_in(60) }),
            &EncodingKey::from_secret(b"not-the-secret"),
        )
        .unwrap();

        assert!(matches!(
            client.authenticate(&token).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn rejects_unknown_kid_and_non_uuid_subject() {
        let (base_url, hits) = serve_jwks(octet_jwks_json()).await;
        let client = FiefClient::with_jwks(&local_settings(&base_url), octet_jwks()).unwrap();

        let unknown = sign(
            json!({ "sub": Uuid::new_v4().to_string(), "exp": exp_in(60) }),
            Some("other"),
        );
        assert!(matches!(
            client.authenticate(&unknown).await,
            Err(AuthError::InvalidToken(_))
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let bad_sub = sign(json!({ "sub": "alice", "exp": exp_in(60) }), Some("test-key"));
        assert!(client.authenticate(&bad_sub).await.is_err());
    }

    #[tokio::test]
    async fn fetches_key_set_on_first_use() {
        let (base_url, hits) = serve_jwks(octet_jwks_json()).await;
        let client = FiefClient::new(&local_settings(&base_url)).unwrap();

        for _ in 0..2 {
            let token = sign(
                json!({ "sub": Uuid::new_v4().to_string(), "exp": exp_in(60) }),
                Some("test-key"),
            );
            assert!(client.authenticate(&token).await.is_ok());
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rotated_key_is_picked_up_without_restart() {
        let rotated = json!({
            "keys": [{ "kty": "oct", "kid": "rotated", "alg": "HS256", "k": "c2VjcmV0" }]
        });
        let (base_url, hits) = serve_jwks(rotated).await;
        let client = FiefClient::with_jwks(&local_settings(&base_url), octet_jwks()).unwrap();

        let token = sign(
            json!({ "sub": Uuid::new_v4().to_string(), "exp": exp_in(60) }),
            Some("rotated"),
        );
        assert!(client.authenticate(&token).await.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // A second miss right after a fetch does not hit the provider again.
        let unknown = sign(
            json!({ "sub": Uuid::new_v4().to_string(), "exp": exp_in(60) }),
            Some("unknown"),
        );
        assert!(client.authenticate(&unknown).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn endpoints_keep_base_path() {
        let client = FiefClient::new(&settings()).unwrap();
        assert_eq!(
            client.endpoint(JWKS_PATH).unwrap().as_str(),
            "https://auth.example.com/tenant/.well-known/jwks.json"
        );
        assert_eq!(
            client.endpoint(USERINFO_PATH).unwrap().as_str(),
            "https://auth.example.com/tenant/api/userinfo"
        );
    }
}
