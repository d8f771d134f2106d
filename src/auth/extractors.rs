use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::warn;

use crate::auth::cookies::{extract_bearer_token, ACCESS_COOKIE};
use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::User;

/// Resolves the access token on a request to a live user row.
///
/// Token source is the `accessToken` cookie, falling back to the
/// `Authorization: Bearer` header. Verification failures and deleted users
/// both reject with 401 before the protected handler runs; the message never
/// reveals which check failed.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie_header = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok());
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = extract_bearer_token(cookie_header, authorization, ACCESS_COOKIE)
            .ok_or_else(|| ApiError::Unauthenticated("missing access token".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(&token).map_err(|_| {
            warn!("invalid or expired access token");
            ApiError::Unauthenticated("invalid access token".into())
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await
            .map_err(ApiError::internal)?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                ApiError::Unauthenticated("invalid access token".into())
            })?;

        Ok(CurrentUser(user))
    }
}
