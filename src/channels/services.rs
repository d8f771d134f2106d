use sqlx::PgPool;
use uuid::Uuid;

use crate::channels::dto::{ChannelProfile, VideoSummary};
use crate::channels::repo;
use crate::error::ApiError;
use crate::users::repo::User;

/// Build a channel's public profile: the target row, two counts against the
/// subscription relation, and a presence check for the viewer. Explicit
/// repository calls instead of a store-side aggregation pipeline.
pub async fn channel_profile(
    db: &PgPool,
    username: &str,
    viewer: Option<Uuid>,
) -> Result<ChannelProfile, ApiError> {
    let channel = User::find_by_username(db, username)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::NotFound("channel does not exist".into()))?;

    let subscriber_count = repo::subscriber_count(db, channel.id)
        .await
        .map_err(ApiError::internal)?;
    let subscribed_to_count = repo::subscribed_to_count(db, channel.id)
        .await
        .map_err(ApiError::internal)?;
    let is_subscribed_by_viewer = match viewer {
        Some(viewer_id) => repo::is_subscribed(db, viewer_id, channel.id)
            .await
            .map_err(ApiError::internal)?,
        None => false,
    };

    Ok(ChannelProfile::project(
        channel,
        subscriber_count,
        subscribed_to_count,
        is_subscribed_by_viewer,
    ))
}

pub async fn watch_history(db: &PgPool, user_id: Uuid) -> Result<Vec<VideoSummary>, ApiError> {
    let rows = repo::watch_history(db, user_id)
        .await
        .map_err(ApiError::internal)?;
    Ok(rows.into_iter().map(VideoSummary::from).collect())
}
