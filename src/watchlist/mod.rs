use axum::{
    routing::{delete, get},
    Router,
};

use crate::state::AppState;

pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/watchlist",
            get(handlers::list_watchlist).post(handlers::add_to_watchlist),
        )
        .route("/watchlist/:symbol", delete(handlers::remove_from_watchlist))
}
