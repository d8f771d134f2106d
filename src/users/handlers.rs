use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{extractors::CurrentUser, handlers::is_valid_email},
    error::ApiError,
    images::services::{cleanup_uploaded, upload_image, UploadItem},
    state::AppState,
    users::dto::UpdateAccountRequest,
    users::repo::{ImageKind, User},
};

/// GET /me
#[instrument(skip(user), fields(user_id = %user.0.id))]
pub async fn get_me(user: CurrentUser) -> Json<User> {
    Json(user.0)
}

/// PATCH /update-account — change fullName and/or email.
#[instrument(skip(state, user, payload), fields(user_id = %user.0.id))]
pub async fn update_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<User>, ApiError> {
    let full_name = payload
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if full_name.is_none() && email.is_none() {
        return Err(ApiError::Validation(
            "fullName or email is required".into(),
        ));
    }
    if let Some(email) = email {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("invalid email address".into()));
        }
    }

    let updated = User::update_account(&state.db, user.0.id, full_name, email).await?;
    info!(user_id = %updated.id, "account details updated");
    Ok(Json(updated))
}

/// PATCH /update-image (multipart) — exactly one of `avatar` / `coverImage`.
#[instrument(skip(state, user, mp), fields(user_id = %user.0.id))]
pub async fn update_image(
    State(state): State<AppState>,
    user: CurrentUser,
    mut mp: Multipart,
) -> Result<Json<User>, ApiError> {
    let mut upload: Option<(ImageKind, UploadItem)> = None;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {e}")))?
    {
        let kind = match field.name() {
            Some("avatar") => ImageKind::Avatar,
            Some("coverImage") => ImageKind::CoverImage,
            _ => continue,
        };
        if upload.is_some() {
            return Err(ApiError::Validation(
                "provide exactly one of avatar or coverImage".into(),
            ));
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("malformed multipart field: {e}")))?;
        upload = Some((kind, UploadItem { body, content_type }));
    }

    let (kind, item) = upload.ok_or_else(|| {
        ApiError::Validation("provide exactly one of avatar or coverImage".into())
    })?;

    let uploaded = upload_image(&state, kind, &item)
        .await
        .map_err(ApiError::internal)?;

    // the user row is only touched after the blob is safely up
    let updated = match User::update_image(&state.db, user.0.id, kind, &uploaded.url).await {
        Ok(u) => u,
        Err(e) => {
            warn!(user_id = %user.0.id, "image persist failed, cleaning up upload");
            cleanup_uploaded(&state, &uploaded.key).await;
            return Err(ApiError::internal(e));
        }
    };

    info!(user_id = %updated.id, kind = ?kind, "profile image updated");
    Ok(Json(updated))
}
