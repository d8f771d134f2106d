use serde::{Deserialize, Serialize};

use crate::users::repo::User;

/// Login accepts either identity; at least one must be present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Body returned by login and refresh. Tokens also travel as cookies; the
/// body copy serves non-browser clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn login_request_allows_either_identity() {
        let by_email: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.com","password":"pw"}"#).unwrap();
        assert!(by_email.username.is_none());
        assert_eq!(by_email.email.as_deref(), Some("a@b.com"));

        let by_username: LoginRequest =
            serde_json::from_str(r#"{"username":"zoro","password":"pw"}"#).unwrap();
        assert_eq!(by_username.username.as_deref(), Some("zoro"));
    }

    #[test]
    fn change_password_request_is_camel_case() {
        let req: ChangePasswordRequest =
            serde_json::from_str(r#"{"oldPassword":"old","newPassword":"new"}"#).unwrap();
        assert_eq!(req.old_password, "old");
        assert_eq!(req.new_password, "new");
    }

    #[test]
    fn auth_response_carries_tokens_but_no_hashes() {
        let response = AuthResponse {
            user: User {
                id: Uuid::new_v4(),
                username: "nami".into(),
                email: "nami@example.com".into(),
                full_name: "Nami".into(),
                password_hash: "$argon2id$secret".into(),
                avatar_url: "https://media.example.com/avatars/n.png".into(),
                cover_image_url: None,
                refresh_token_hash: Some("cafebabe".into()),
                created_at: OffsetDateTime::UNIX_EPOCH,
                updated_at: OffsetDateTime::UNIX_EPOCH,
            },
            access_token: "a.b.c".into(),
            refresh_token: "d.e.f".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""accessToken":"a.b.c""#));
        assert!(json.contains(r#""refreshToken":"d.e.f""#));
        assert!(!json.contains("passwordHash"));
        assert!(!json.contains("refreshTokenHash"));
        assert!(!json.contains("cafebabe"));
    }
}
