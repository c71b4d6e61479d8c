use axum::{http::HeaderValue, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{protected, public};
use crate::state::AppState;

/// Build the full application router with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.client_origin);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected
        .merge(cat_routes())
        .merge(user_routes())
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn cat_routes() -> Router<AppState> {
    use protected::cat;

    Router::new()
        .route("/cat", get(cat::list).post(cat::create))
        .route("/cat/", get(cat::list).post(cat::create))
        .route(
            "/cat/:id",
            get(cat::get).put(cat::update).delete(cat::delete),
        )
}

fn user_routes() -> Router<AppState> {
    use protected::user;

    Router::new()
        .route("/user/info", get(user::info))
        .route("/user/token", get(user::token))
}

/// Credentialed CORS for the single configured client origin.
fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!("CLIENT_ORIGIN '{}' is not a valid header value; CORS disabled", origin);
            layer
        }
    }
}
