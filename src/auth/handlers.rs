use axum::{
    extract::{multipart::Field, FromRef, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookies::{
            expired_cookie, extract_bearer_token, session_cookie, ACCESS_COOKIE, REFRESH_COOKIE,
        },
        dto::{AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse},
        extractors::CurrentUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        tokens::{self, TokenPair},
    },
    error::ApiError,
    images::services::{cleanup_uploaded, upload_image, UploadItem, UploadedImage},
    state::AppState,
    users::repo::{ImageKind, NewUser, User},
};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

async fn text_field(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart field: {e}")))
}

async fn file_field(field: Field<'_>) -> Result<UploadItem, ApiError> {
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".into());
    let body = field
        .bytes()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart field: {e}")))?;
    Ok(UploadItem { body, content_type })
}

fn session_headers(keys: &JwtKeys, pair: &TokenPair) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    for cookie in [
        session_cookie(ACCESS_COOKIE, &pair.access_token, keys.access_ttl),
        session_cookie(REFRESH_COOKIE, &pair.refresh_token, keys.refresh_ttl),
    ] {
        headers.append(header::SET_COOKIE, cookie.parse().map_err(ApiError::internal)?);
    }
    Ok(headers)
}

fn clear_session_headers() -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    for cookie in [expired_cookie(ACCESS_COOKIE), expired_cookie(REFRESH_COOKIE)] {
        headers.append(header::SET_COOKIE, cookie.parse().map_err(ApiError::internal)?);
    }
    Ok(headers)
}

/// POST /register (multipart)
/// Text fields: fullName, username, email, password.
/// Files: avatar (required), coverImage (optional).
#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let mut full_name: Option<String> = None;
    let mut username: Option<String> = None;
    let mut email: Option<String> = None;
    let mut password: Option<String> = None;
    let mut avatar: Option<UploadItem> = None;
    let mut cover_image: Option<UploadItem> = None;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("fullName") => full_name = Some(text_field(field).await?),
            Some("username") => username = Some(text_field(field).await?),
            Some("email") => email = Some(text_field(field).await?),
            Some("password") => password = Some(text_field(field).await?),
            Some("avatar") => avatar = Some(file_field(field).await?),
            Some("coverImage") => cover_image = Some(file_field(field).await?),
            _ => {}
        }
    }

    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let (full_name, username, email, password) = match (
        non_blank(full_name),
        non_blank(username),
        non_blank(email),
        password.filter(|p| !p.trim().is_empty()),
    ) {
        (Some(f), Some(u), Some(e), Some(p)) => (f, u.to_lowercase(), e.to_lowercase(), p),
        _ => {
            return Err(ApiError::Validation(
                "fullName, username, email and password are required".into(),
            ))
        }
    };

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("invalid email address".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation("password too short".into()));
    }

    if User::exists_with_identity(&state.db, &username, &email)
        .await
        .map_err(ApiError::internal)?
    {
        warn!(username = %username, "registration for existing identity");
        return Err(ApiError::Conflict("user already exists".into()));
    }

    let avatar = avatar.ok_or_else(|| ApiError::Validation("avatar image is required".into()))?;

    let uploaded_avatar = upload_image(&state, ImageKind::Avatar, &avatar)
        .await
        .map_err(ApiError::internal)?;
    let uploaded_cover: Option<UploadedImage> = match &cover_image {
        Some(item) => {
            match upload_image(&state, ImageKind::CoverImage, item).await {
                Ok(up) => Some(up),
                Err(e) => {
                    // avatar made it up already; don't leave it orphaned
                    cleanup_uploaded(&state, &uploaded_avatar.key).await;
                    return Err(ApiError::internal(e));
                }
            }
        }
        None => None,
    };

    let hash = hash_password(&password).map_err(ApiError::internal)?;
    let created = User::create(
        &state.db,
        NewUser {
            username: &username,
            email: &email,
            full_name: &full_name,
            password_hash: &hash,
            avatar_url: &uploaded_avatar.url,
            cover_image_url: uploaded_cover.as_ref().map(|c| c.url.as_str()),
        },
    )
    .await;

    let user = match created {
        Ok(u) => u,
        Err(e) => {
            cleanup_uploaded(&state, &uploaded_avatar.key).await;
            if let Some(cover) = &uploaded_cover {
                cleanup_uploaded(&state, &cover.key).await;
            }
            return Err(e.into());
        }
    };

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /login — verifies credentials and opens a session: new token pair,
/// refresh hash persisted, both tokens set as cookies.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    if payload.username.is_none() && payload.email.is_none() {
        return Err(ApiError::Validation("username or email is required".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }

    let user = User::find_by_identity(
        &state.db,
        payload.username.as_deref(),
        payload.email.as_deref(),
    )
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(|| ApiError::NotFound("user does not exist".into()))?;

    let ok = verify_password(&payload.password, &user.password_hash).map_err(ApiError::internal)?;
    if !ok {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::Unauthenticated("invalid user credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let pair = tokens::issue_token_pair(&state.db, &keys, user.id).await?;
    let headers = session_headers(&keys, &pair)?;

    info!(user_id = %user.id, "user logged in");
    Ok((
        headers,
        Json(AuthResponse {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

/// POST /logout — drops the stored refresh hash and expires both cookies.
/// Already-issued access tokens stay valid until their own expiry.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<(HeaderMap, Json<MessageResponse>), ApiError> {
    tokens::invalidate(&state.db, user.0.id).await?;
    info!(user_id = %user.0.id, "user logged out");
    Ok((
        clear_session_headers()?,
        Json(MessageResponse {
            message: "logged out",
        }),
    ))
}

/// POST /refresh-token — rotates the presented refresh token (cookie or
/// Bearer header) into a brand-new pair.
#[instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let cookie_header = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let presented = extract_bearer_token(cookie_header, authorization, REFRESH_COOKIE)
        .ok_or_else(|| ApiError::Unauthenticated("missing refresh token".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let (user, pair) = tokens::rotate_refresh_token(&state.db, &keys, &presented).await?;
    let response_headers = session_headers(&keys, &pair)?;

    info!(user_id = %user.id, "refresh token rotated");
    Ok((
        response_headers,
        Json(AuthResponse {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

/// POST /change-password
#[instrument(skip(state, user, payload), fields(user_id = %user.0.id))]
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.old_password.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::Validation(
            "oldPassword and newPassword are required".into(),
        ));
    }
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation("password too short".into()));
    }

    let ok = verify_password(&payload.old_password, &user.0.password_hash)
        .map_err(ApiError::internal)?;
    if !ok {
        warn!(user_id = %user.0.id, "password change with invalid old password");
        return Err(ApiError::Unauthenticated("invalid old password".into()));
    }

    let hash = hash_password(&payload.new_password).map_err(ApiError::internal)?;
    User::set_password_hash(&state.db, user.0.id, &hash)
        .await
        .map_err(ApiError::internal)?;

    info!(user_id = %user.0.id, "password changed");
    Ok(Json(MessageResponse {
        message: "password changed",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@example.com"));
    }

    #[test]
    fn session_headers_set_both_cookies() {
        let keys = JwtKeys::from_config(&crate::config::JwtConfig {
            access_secret: "a".into(),
            refresh_secret: "r".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            access_ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        });
        let pair = TokenPair {
            access_token: "acc.tok.en".into(),
            refresh_token: "ref.tok.en".into(),
        };
        let headers = session_headers(&keys, &pair).unwrap();
        let cookies: Vec<_> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("accessToken=acc.tok.en;"));
        assert!(cookies[0].contains("Max-Age=300"));
        assert!(cookies[1].starts_with("refreshToken=ref.tok.en;"));
        assert!(cookies[1].contains("Max-Age=3600"));
    }

    #[test]
    fn clear_session_headers_expire_both_cookies() {
        let headers = clear_session_headers().unwrap();
        let cookies: Vec<_> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }
}
