use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::auth::{AccessTokenInfo, AuthError};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::UserId;

/// Authenticated caller, resolved from the `Authorization: Bearer` header.
///
/// Taking this as a handler argument is what makes a route protected: the
/// request is rejected with 401 before the handler body runs.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: UserId,
    pub token: AccessTokenInfo,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let info = state.identity.authenticate(token).await?;

        tracing::debug!(user_id = %info.id, "Authenticated request");

        Ok(AuthUser {
            user_id: info.id,
            token: info,
        })
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_str = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Authorization header is not ASCII".into()))?;

    let (scheme, token) = auth_str
        .split_once(' ')
        .ok_or(AuthError::MissingCredentials)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingCredentials);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token)
}
