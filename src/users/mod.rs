use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch},
    Router,
};

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::get_me))
        .route("/update-account", patch(handlers::update_account))
        .route("/update-image", patch(handlers::update_image))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}
