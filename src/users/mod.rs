use axum::{
    routing::{delete, get, patch},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(handlers::get_profile))
        .route("/updateProfile", patch(handlers::update_profile))
        .route("/updatePreferences", patch(handlers::update_preferences))
        .route("/deleteAccount", delete(handlers::delete_account))
}
