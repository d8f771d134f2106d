use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::channels::repo::WatchedVideoRow;
use crate::users::repo::User;

/// Public channel view: profile fields plus derived subscription numbers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub subscriber_count: i64,
    pub subscribed_to_count: i64,
    pub is_subscribed_by_viewer: bool,
}

impl ChannelProfile {
    pub fn project(
        channel: User,
        subscriber_count: i64,
        subscribed_to_count: i64,
        is_subscribed_by_viewer: bool,
    ) -> Self {
        Self {
            full_name: channel.full_name,
            username: channel.username,
            email: channel.email,
            avatar: channel.avatar_url,
            cover_image: channel.cover_image_url,
            subscriber_count,
            subscribed_to_count,
            is_subscribed_by_viewer,
        }
    }
}

/// Minimal owner projection nested inside a watched video.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: Uuid,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_secs: i64,
    pub views: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub owner: OwnerSummary,
}

impl From<WatchedVideoRow> for VideoSummary {
    fn from(row: WatchedVideoRow) -> Self {
        Self {
            id: row.video_id,
            title: row.title,
            thumbnail_url: row.thumbnail_url,
            duration_secs: row.duration_secs,
            views: row.views,
            created_at: row.created_at,
            owner: OwnerSummary {
                full_name: row.owner_full_name,
                username: row.owner_username,
                avatar: row.owner_avatar_url,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> WatchedVideoRow {
        WatchedVideoRow {
            video_id: Uuid::new_v4(),
            title: "Sailing the Grand Line".into(),
            thumbnail_url: "https://media.example.com/thumbs/1.jpg".into(),
            duration_secs: 613,
            views: 42,
            created_at: OffsetDateTime::UNIX_EPOCH,
            owner_full_name: "Nico Robin".into(),
            owner_username: "nrobin".into(),
            owner_avatar_url: "https://media.example.com/avatars/r.png".into(),
        }
    }

    #[test]
    fn owner_projection_has_exactly_three_fields() {
        let summary = VideoSummary::from(sample_row());
        let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
        let owner = json["owner"].as_object().unwrap();
        assert_eq!(owner.len(), 3);
        assert_eq!(owner["fullName"], "Nico Robin");
        assert_eq!(owner["username"], "nrobin");
        assert!(owner["avatar"].as_str().unwrap().contains("avatars"));
    }

    #[test]
    fn channel_profile_serializes_derived_fields() {
        let profile = ChannelProfile {
            full_name: "Monkey D. Luffy".into(),
            username: "onepiece".into(),
            email: "luffy@example.com".into(),
            avatar: "https://media.example.com/avatars/a.png".into(),
            cover_image: None,
            subscriber_count: 3,
            subscribed_to_count: 2,
            is_subscribed_by_viewer: true,
        };
        let json: serde_json::Value = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["subscriberCount"], 3);
        assert_eq!(json["subscribedToCount"], 2);
        assert_eq!(json["isSubscribedByViewer"], true);
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("refreshTokenHash").is_none());
        assert!(json.get("id").is_none());
    }
}
