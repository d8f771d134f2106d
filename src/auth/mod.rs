use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::post,
    Router,
};

pub mod cookies;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod tokens;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/refresh-token", post(handlers::refresh))
        .route("/change-password", post(handlers::change_password))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // register carries image files
}
