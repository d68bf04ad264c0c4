use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::instrument;

use crate::audit::dto::{ActivityResponse, AlertsResponse, HistoryResponse, PublicSession};
use crate::audit::recorder;
use crate::audit::repo::{AuditEntry, AuditLog};
use crate::auth::guard::AuthSession;
use crate::error::ApiError;
use crate::sessions::ActiveSession;
use crate::state::AppState;

#[instrument(skip(state, auth))]
pub async fn activity_and_session_history(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (_, activity) = AuditLog::lists(&state.db, &auth.user.email)
        .await
        .map_err(ApiError::store)?;
    let sessions = ActiveSession::list_by_email(&state.db, &auth.user.email)
        .await
        .map_err(ApiError::store)?;

    Ok(Json(HistoryResponse {
        activity: activity.into_iter().map(Into::into).collect(),
        sessions: sessions
            .into_iter()
            .map(|s| PublicSession::from_session(s, &auth.session.token))
            .collect(),
    }))
}

#[instrument(skip(state, auth))]
pub async fn get_all_activity_history(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<ActivityResponse>, ApiError> {
    let (_, activity) = AuditLog::lists(&state.db, &auth.user.email)
        .await
        .map_err(ApiError::store)?;
    Ok(Json(ActivityResponse {
        activity: activity.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, auth))]
pub async fn get_all_security_alerts(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<AlertsResponse>, ApiError> {
    let (alerts, _) = AuditLog::lists(&state.db, &auth.user.email)
        .await
        .map_err(ApiError::store)?;
    Ok(Json(AlertsResponse {
        alerts: alerts.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, auth))]
pub async fn clear_activity_history(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<Value>, ApiError> {
    AuditLog::clear_activity(&state.db, &auth.user.email)
        .await
        .map_err(ApiError::store)?;
    recorder::record_alert(
        &state,
        &auth.user.email,
        AuditEntry::new(
            &auth.session.os,
            &auth.session.browser,
            "security",
            "Activity history cleared.",
            &auth.session.token,
        ),
    );
    Ok(Json(json!({ "message": "Activity history cleared." })))
}

#[instrument(skip(state, auth))]
pub async fn clear_security_alerts(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<Value>, ApiError> {
    AuditLog::clear_alerts(&state.db, &auth.user.email)
        .await
        .map_err(ApiError::store)?;
    Ok(Json(json!({ "message": "Security alerts cleared." })))
}
