use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

use crate::audit::recorder;
use crate::audit::repo::AuditEntry;
use crate::auth::guard::AuthSession;
use crate::error::ApiError;
use crate::state::AppState;
use crate::watchlist::repo::WatchlistItem;

#[derive(Debug, Deserialize)]
pub struct AddSymbolRequest {
    pub symbol: String,
}

fn normalize_symbol(raw: &str) -> Result<String, ApiError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() || symbol.len() > 12 {
        return Err(ApiError::BadRequest("Invalid ticker symbol.".into()));
    }
    Ok(symbol)
}

#[instrument(skip(state, auth))]
pub async fn list_watchlist(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<Vec<WatchlistItem>>, ApiError> {
    let items = WatchlistItem::list_by_email(&state.db, &auth.user.email)
        .await
        .map_err(ApiError::store)?;
    Ok(Json(items))
}

#[instrument(skip(state, auth, payload))]
pub async fn add_to_watchlist(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(payload): Json<AddSymbolRequest>,
) -> Result<(StatusCode, Json<WatchlistItem>), ApiError> {
    let symbol = normalize_symbol(&payload.symbol)?;
    let item = WatchlistItem::add(&state.db, &auth.user.email, &symbol)
        .await
        .map_err(ApiError::store)?;

    recorder::record_activity(
        &state,
        &auth.user.email,
        AuditEntry::new(
            &auth.session.os,
            &auth.session.browser,
            "watchlist",
            format!("Added {symbol} to watchlist."),
            &auth.session.token,
        ),
    );
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state, auth))]
pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let symbol = normalize_symbol(&symbol)?;
    let removed = WatchlistItem::remove(&state.db, &auth.user.email, &symbol)
        .await
        .map_err(ApiError::store)?;
    if removed == 0 {
        return Err(ApiError::Gone("Symbol is not on your watchlist.".into()));
    }

    recorder::record_activity(
        &state,
        &auth.user.email,
        AuditEntry::new(
            &auth.session.os,
            &auth.session.browser,
            "watchlist",
            format!("Removed {symbol} from watchlist."),
            &auth.session.token,
        ),
    );
    Ok(Json(json!({ "message": "Symbol removed." })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_trimmed_and_uppercased() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
    }

    #[test]
    fn empty_and_oversized_symbols_are_rejected() {
        assert!(normalize_symbol("  ").is_err());
        assert!(normalize_symbol("THIRTEENCHARSX").is_err());
    }
}
