use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service name, version and environment
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let settings = &state.settings;
    let mut body = json!({
        "name": settings.app_name,
        "version": settings.app_version,
        "environment": settings.environment,
    });

    // OAuth2 endpoints are only advertised outside production-like deployments.
    if settings.environment.is_debug() {
        body["authorize_url"] = json!(settings.identity.authorize_url);
        body["token_url"] = json!(settings.identity.token_url);
    }

    Json(body)
}

/// GET /health - Liveness plus a database ping
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.cats.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::FiefClient;
    use crate::config::Settings;
    use crate::database::InMemoryCatStore;
    use crate::services::CatService;

    fn state(environment: &str) -> AppState {
        let env = [
            ("APP_NAME", "Cattery"),
            ("APP_VERSION", "1.0.0"),
            ("DATABASE_URI", "mongodb://localhost:27017/cats"),
            ("ENVIRONMENT", environment),
            ("CLIENT_ORIGIN", "http://localhost:5173"),
            ("CLIENT_ID", "client"),
            ("CLIENT_SECRET", "secret"),
            ("FIEF_URL", "http://localhost:8001"),
            ("AUTHORIZE_URL", "http://localhost:8001/authorize"),
            ("TOKEN_URL", "http://localhost:8001/api/token"),
        ];
        let settings = Settings::from_lookup(|key| {
            env.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
        })
        .unwrap();

        AppState {
            cats: CatService::new(Arc::new(InMemoryCatStore::new()), settings.reference_offset),
            identity: Arc::new(FiefClient::new(&settings.identity).unwrap()),
            settings: Arc::new(settings),
        }
    }

    #[tokio::test]
    async fn root_lists_oauth2_urls_in_debug_environments() {
        let Json(body) = root(State(state("LOCAL"))).await;
        assert_eq!(body["authorize_url"], "http://localhost:8001/authorize");
        assert_eq!(body["token_url"], "http://localhost:8001/api/token");
    }

    #[tokio::test]
    async fn root_hides_oauth2_urls_in_production() {
        let Json(body) = root(State(state("PRODUCTION"))).await;
        assert_eq!(body["environment"], "PRODUCTION");
        assert!(body.get("authorize_url").is_none());
        assert!(body.get("token_url").is_none());
    }
}
