use axum::{extract::State, Json};

use crate::auth::{AccessTokenInfo, UserInfo};
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /user/info - Identity claims for the caller, fetched from the provider
pub async fn info(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<UserInfo>> {
    let info = state.identity.userinfo(&user.token.access_token).await?;
    Ok(Json(info))
}

/// GET /user/token - Claims of the caller's verified access token
pub async fn token(user: AuthUser) -> Json<AccessTokenInfo> {
    Json(user.token)
}
