use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::auth::guard::AuthSession;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

fn map_upstream(err: anyhow::Error) -> ApiError {
    let timed_out = err
        .downcast_ref::<reqwest::Error>()
        .map(reqwest::Error::is_timeout)
        .unwrap_or(false);
    if timed_out {
        ApiError::UpstreamTimeout(err)
    } else {
        ApiError::Upstream(err)
    }
}

#[instrument(skip(state, _auth))]
pub async fn quote(
    State(state): State<AppState>,
    _auth: AuthSession,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::BadRequest("Ticker symbol is required.".into()));
    }
    let value = state.market.quote(&symbol).await.map_err(map_upstream)?;
    Ok(Json(value))
}

#[instrument(skip(state, _auth))]
pub async fn search(
    State(state): State<AppState>,
    _auth: AuthSession,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Search query is required.".into()));
    }
    let value = state.market.search(query).await.map_err(map_upstream)?;
    Ok(Json(value))
}
