use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;
use crate::users::repo::User;

/// Wording shared by every rotation rejection so callers cannot distinguish
/// replayed, raced, or foreign tokens.
const ROTATION_REJECTED: &str = "refresh token expired or already used";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// One-way digest stored on the user row in place of the raw refresh token.
/// A database read alone cannot mint valid sessions from it.
pub fn token_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sign a fresh access/refresh pair for `user_id` and persist the refresh
/// token's hash, overwriting any prior session. Everything fails as
/// `Internal` here: callers must never hand out a partial pair.
pub async fn issue_token_pair(
    db: &PgPool,
    keys: &JwtKeys,
    user_id: Uuid,
) -> Result<TokenPair, ApiError> {
    let access_token = keys.sign_access(user_id).map_err(ApiError::internal)?;
    let refresh_token = keys.sign_refresh(user_id).map_err(ApiError::internal)?;

    let rows = User::set_refresh_token_hash(db, user_id, Some(&token_hash(&refresh_token)))
        .await
        .map_err(ApiError::internal)?;
    if rows == 0 {
        return Err(ApiError::internal(anyhow::anyhow!(
            "user {user_id} vanished during token issuance"
        )));
    }

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Exchange a refresh token for a new pair.
///
/// The stored hash is single-use: issuing the new pair replaces it, so a
/// replayed token fails the exact-match check. The swap is a compare-and-set
/// on the presented hash, which also decides races between concurrent
/// rotations — at most one caller wins, losers get 401.
pub async fn rotate_refresh_token(
    db: &PgPool,
    keys: &JwtKeys,
    presented: &str,
) -> Result<(User, TokenPair), ApiError> {
    let claims = keys
        .verify_refresh(presented)
        .map_err(|_| ApiError::Unauthenticated("invalid refresh token".into()))?;

    let user = User::find_by_id(db, claims.sub)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::Unauthenticated("invalid refresh token".into()))?;

    let presented_hash = token_hash(presented);
    if user.refresh_token_hash.as_deref() != Some(presented_hash.as_str()) {
        warn!(user_id = %user.id, "refresh token does not match stored hash");
        return Err(ApiError::Unauthenticated(ROTATION_REJECTED.into()));
    }

    let access_token = keys.sign_access(user.id).map_err(ApiError::internal)?;
    let refresh_token = keys.sign_refresh(user.id).map_err(ApiError::internal)?;
    let new_hash = token_hash(&refresh_token);

    let swapped = User::swap_refresh_token_hash(db, user.id, &presented_hash, &new_hash)
        .await
        .map_err(ApiError::internal)?;
    if !swapped {
        warn!(user_id = %user.id, "lost refresh rotation race");
        return Err(ApiError::Unauthenticated(ROTATION_REJECTED.into()));
    }

    Ok((
        user,
        TokenPair {
            access_token,
            refresh_token,
        },
    ))
}

/// Drop the stored hash so every outstanding refresh token stops rotating.
/// Outstanding access tokens run out on their own expiry.
pub async fn invalidate(db: &PgPool, user_id: Uuid) -> Result<(), ApiError> {
    User::set_refresh_token_hash(db, user_id, None)
        .await
        .map_err(ApiError::internal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_deterministic() {
        let a = token_hash("some.jwt.token");
        let b = token_hash("some.jwt.token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // sha-256 hex
    }

    #[test]
    fn token_hash_differs_per_token() {
        assert_ne!(token_hash("token-one"), token_hash("token-two"));
    }

    #[test]
    fn pair_serializes_camel_case_fields() {
        let pair = TokenPair {
            access_token: "a.b.c".into(),
            refresh_token: "d.e.f".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["accessToken"], "a.b.c");
        assert_eq!(json["refreshToken"], "d.e.f");
    }
}
