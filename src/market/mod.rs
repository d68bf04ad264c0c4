use axum::{routing::get, Router};

use crate::state::AppState;

pub mod client;
pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/market/quote/:symbol", get(handlers::quote))
        .route("/market/search", get(handlers::search))
}
