use axum::{
    routing::{delete, get},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod recorder;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/activityAndSessionHistory",
            get(handlers::activity_and_session_history),
        )
        .route(
            "/getAllActivityHistory",
            get(handlers::get_all_activity_history),
        )
        .route(
            "/getAllSecurityAlerts",
            get(handlers::get_all_security_alerts),
        )
        .route(
            "/clearActivityHistory",
            delete(handlers::clear_activity_history),
        )
        .route(
            "/clearSecurityAlerts",
            delete(handlers::clear_security_alerts),
        )
}
