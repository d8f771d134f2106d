use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;

use crate::{
    auth::extractors::CurrentUser,
    channels::dto::{ChannelProfile, VideoSummary},
    channels::services,
    error::ApiError,
    state::AppState,
};

/// GET /channel/:username
#[instrument(skip(state, viewer), fields(viewer_id = %viewer.0.id))]
pub async fn channel_profile(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ChannelProfile>, ApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::Validation("username is required".into()));
    }
    let profile = services::channel_profile(&state.db, username, Some(viewer.0.id)).await?;
    Ok(Json(profile))
}

/// GET /watch-history
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn watch_history(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<VideoSummary>>, ApiError> {
    let videos = services::watch_history(&state.db, user.0.id).await?;
    Ok(Json(videos))
}
