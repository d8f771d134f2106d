use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Subscribers of a channel: rows pointing AT it.
pub async fn subscriber_count(db: &PgPool, channel_id: Uuid) -> anyhow::Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1"#,
    )
    .bind(channel_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}

/// Channels a user subscribes to: rows pointing FROM them.
pub async fn subscribed_to_count(db: &PgPool, subscriber_id: Uuid) -> anyhow::Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1"#,
    )
    .bind(subscriber_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}

pub async fn is_subscribed(
    db: &PgPool,
    subscriber_id: Uuid,
    channel_id: Uuid,
) -> anyhow::Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM subscriptions
            WHERE subscriber_id = $1 AND channel_id = $2
        )
        "#,
    )
    .bind(subscriber_id)
    .bind(channel_id)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

/// One watched video joined with its owner's public fields, flattened for
/// sqlx; the handler folds it into the nested response shape.
#[derive(Debug, Clone, FromRow)]
pub struct WatchedVideoRow {
    pub video_id: Uuid,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_secs: i64,
    pub views: i64,
    pub created_at: OffsetDateTime,
    pub owner_full_name: String,
    pub owner_username: String,
    pub owner_avatar_url: String,
}

/// A user's watch history in stored insertion order. The `position` column
/// is the ordering key; nothing here re-sorts by recency or title.
pub async fn watch_history(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<WatchedVideoRow>> {
    let rows = sqlx::query_as::<_, WatchedVideoRow>(
        r#"
        SELECT v.id AS video_id,
               v.title,
               v.thumbnail_url,
               v.duration_secs,
               v.views,
               v.created_at,
               u.full_name AS owner_full_name,
               u.username AS owner_username,
               u.avatar_url AS owner_avatar_url
        FROM watch_history wh
        JOIN videos v ON v.id = wh.video_id
        JOIN users u ON u.id = v.owner_id
        WHERE wh.user_id = $1
        ORDER BY wh.position
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
