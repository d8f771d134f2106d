use crate::state::AppState;
use axum::{routing::get, Router};

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/channel/:username", get(handlers::channel_profile))
        .route("/watch-history", get(handlers::watch_history))
}
