use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// A user row. Doubles as the "channel" entity: subscriptions point at users.
///
/// Hash fields never serialize, so handlers can return this directly.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
    #[serde(rename = "coverImage")]
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub password_hash: &'a str,
    pub avatar_url: &'a str,
    pub cover_image_url: Option<&'a str>,
}

/// Which profile image slot an upload replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Avatar,
    CoverImage,
}

impl ImageKind {
    pub fn key_prefix(self) -> &'static str {
        match self {
            ImageKind::Avatar => "avatars",
            ImageKind::CoverImage => "covers",
        }
    }
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, password_hash, avatar_url,
                   cover_image_url, refresh_token_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Username lookups are case-normalized: rows are stored lowercase.
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, password_hash, avatar_url,
                   cover_image_url, refresh_token_hash, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username.trim().to_lowercase())
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find by username or email, whichever identity the client supplied.
    pub async fn find_by_identity(
        db: &PgPool,
        username: Option<&str>,
        email: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, password_hash, avatar_url,
                   cover_image_url, refresh_token_hash, created_at, updated_at
            FROM users
            WHERE ($1::text IS NOT NULL AND username = $1)
               OR ($2::text IS NOT NULL AND email = $2)
            "#,
        )
        .bind(username.map(|u| u.trim().to_lowercase()))
        .bind(email.map(|e| e.trim().to_lowercase()))
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn exists_with_identity(
        db: &PgPool,
        username: &str,
        email: &str,
    ) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)"#,
        )
        .bind(username.trim().to_lowercase())
        .bind(email.trim().to_lowercase())
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, full_name, password_hash, avatar_url, cover_image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, full_name, password_hash, avatar_url,
                      cover_image_url, refresh_token_hash, created_at, updated_at
            "#,
        )
        .bind(new.username)
        .bind(new.email)
        .bind(new.full_name)
        .bind(new.password_hash)
        .bind(new.avatar_url)
        .bind(new.cover_image_url)
        .fetch_one(db)
        .await
    }

    /// Overwrite the stored refresh-token hash (None clears it). Returns the
    /// number of rows touched so callers can detect a vanished user.
    pub async fn set_refresh_token_hash(
        db: &PgPool,
        id: Uuid,
        hash: Option<&str>,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"UPDATE users SET refresh_token_hash = $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(id)
        .bind(hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Compare-and-set hash swap used by refresh rotation. Succeeds only if
    /// the stored hash still equals `expected`; a concurrent rotation that got
    /// there first makes this return false.
    pub async fn swap_refresh_token_hash(
        db: &PgPool,
        id: Uuid,
        expected: &str,
        new: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $3, updated_at = now()
            WHERE id = $1 AND refresh_token_hash = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(new)
        .execute(db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn set_password_hash(db: &PgPool, id: Uuid, hash: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1"#)
            .bind(id)
            .bind(hash)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn update_image(
        db: &PgPool,
        id: Uuid,
        kind: ImageKind,
        url: &str,
    ) -> anyhow::Result<User> {
        let query = match kind {
            ImageKind::Avatar => {
                r#"
                UPDATE users SET avatar_url = $2, updated_at = now()
                WHERE id = $1
                RETURNING id, username, email, full_name, password_hash, avatar_url,
                          cover_image_url, refresh_token_hash, created_at, updated_at
                "#
            }
            ImageKind::CoverImage => {
                r#"
                UPDATE users SET cover_image_url = $2, updated_at = now()
                WHERE id = $1
                RETURNING id, username, email, full_name, password_hash, avatar_url,
                          cover_image_url, refresh_token_hash, created_at, updated_at
                "#
            }
        };
        let user = sqlx::query_as::<_, User>(query)
            .bind(id)
            .bind(url)
            .fetch_one(db)
            .await?;
        Ok(user)
    }

    pub async fn update_account(
        db: &PgPool,
        id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                updated_at = now()
            WHERE id = $1
            RETURNING id, username, email, full_name, password_hash, avatar_url,
                      cover_image_url, refresh_token_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email.map(|e| e.trim().to_lowercase()))
        .fetch_one(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "onepiece".into(),
            email: "luffy@example.com".into(),
            full_name: "Monkey D. Luffy".into(),
            password_hash: "$argon2id$secret".into(),
            avatar_url: "https://media.example.com/avatars/a.png".into(),
            cover_image_url: None,
            refresh_token_hash: Some("deadbeef".into()),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn serialization_never_exposes_hashes() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("passwordHash"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("refreshTokenHash"));
        assert!(!json.contains("deadbeef"));
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn serialization_uses_camel_case_public_fields() {
        let json: serde_json::Value = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("fullName").is_some());
        assert!(json.get("avatar").is_some());
        assert!(json.get("coverImage").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("full_name").is_none());
    }

    #[test]
    fn image_kind_key_prefixes() {
        assert_eq!(ImageKind::Avatar.key_prefix(), "avatars");
        assert_eq!(ImageKind::CoverImage.key_prefix(), "covers");
    }
}
