use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde_json::{json, Value};

use crate::api::{Cat, CatPatch, ListQuery, NewCat};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::types::CatId;

/// GET /cat/ - List the caller's cats created within the date window
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Cat>>> {
    let Query(query) = query.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let cats = state
        .cats
        .list(user.user_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(cats))
}

/// POST /cat/ - Create a cat owned by the caller
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<NewCat>, JsonRejection>,
) -> ApiResult<Json<Cat>> {
    let Json(input) = payload.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let cat = state.cats.create(user.user_id, input).await?;
    Ok(Json(cat))
}

/// GET /cat/:id - Get one of the caller's cats
pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Cat>> {
    let cat = state.cats.get(user.user_id, parse_id(&id)?).await?;
    Ok(Json(cat))
}

/// PUT /cat/:id - Partially update one of the caller's cats
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<CatPatch>, JsonRejection>,
) -> ApiResult<Json<Cat>> {
    let id = parse_id(&id)?;
    let Json(patch) = payload.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let cat = state.cats.update(user.user_id, id, patch).await?;
    Ok(Json(cat))
}

/// DELETE /cat/:id - Delete one of the caller's cats
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.cats.delete(user.user_id, parse_id(&id)?).await?;
    Ok(Json(json!({ "message": "Cat deleted" })))
}

fn parse_id(raw: &str) -> Result<CatId, ApiError> {
    raw.parse().map_err(ApiError::unprocessable)
}
