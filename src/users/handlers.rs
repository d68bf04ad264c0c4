use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::audit::recorder;
use crate::audit::repo::{AuditEntry, AuditLog};
use crate::auth::cookie;
use crate::auth::guard::AuthSession;
use crate::error::ApiError;
use crate::sessions::ActiveSession;
use crate::state::AppState;
use crate::users::dto::PublicUser;
use crate::users::repo::{PreferencesPatch, ProfilePatch, User};

#[instrument(skip(auth))]
pub async fn get_profile(auth: AuthSession) -> Json<PublicUser> {
    Json(PublicUser::from(auth.user))
}

#[instrument(skip(state, auth, patch))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<PublicUser>, ApiError> {
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("Name cannot be empty.".into()));
        }
    }

    let updated = User::update_profile(&state.db, &auth.user.email, &patch)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::Gone("This account no longer exists.".into()))?;

    recorder::record_activity(
        &state,
        &auth.user.email,
        AuditEntry::new(
            &auth.session.os,
            &auth.session.browser,
            "profile",
            "Profile updated.",
            &auth.session.token,
        ),
    );
    Ok(Json(PublicUser::from(updated)))
}

#[instrument(skip(state, auth, patch))]
pub async fn update_preferences(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(patch): Json<PreferencesPatch>,
) -> Result<Json<PublicUser>, ApiError> {
    let updated = User::update_preferences(&state.db, &auth.user.email, &patch)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::Gone("This account no longer exists.".into()))?;

    recorder::record_activity(
        &state,
        &auth.user.email,
        AuditEntry::new(
            &auth.session.os,
            &auth.session.browser,
            "profile",
            "Preferences updated.",
            &auth.session.token,
        ),
    );
    Ok(Json(PublicUser::from(updated)))
}

/// Deletes the account and cascades to sessions, the audit document and
/// watchlist rows. All four deletes run in one transaction so a store
/// failure midway leaves no half-deleted account behind.
#[instrument(skip(state, auth))]
pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let email = auth.user.email.clone();

    let mut tx = state.db.begin().await?;
    ActiveSession::delete_all_for_email(&mut *tx, &email)
        .await
        .map_err(ApiError::store)?;
    AuditLog::delete(&mut *tx, &email)
        .await
        .map_err(ApiError::store)?;
    crate::watchlist::repo::WatchlistItem::delete_all_for_email(&mut *tx, &email)
        .await
        .map_err(ApiError::store)?;
    let deleted = User::delete(&mut *tx, &email)
        .await
        .map_err(ApiError::store)?;
    if deleted == 0 {
        // dropping the transaction rolls the dependent deletes back
        return Err(ApiError::Gone("This account no longer exists.".into()));
    }
    tx.commit().await?;

    info!(email = %email, "account deleted");

    let jar = CookieJar::new().add(cookie::clear());
    Ok((jar, Json(json!({ "message": "Account deleted." }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    // Type-level check: every step of the deletion cascade accepts the same
    // transaction handle, so none of them can slip out onto the bare pool.
    #[allow(dead_code)]
    async fn cascade_shares_one_transaction(db: PgPool) -> anyhow::Result<()> {
        let mut tx = db.begin().await?;
        ActiveSession::delete_all_for_email(&mut *tx, "a@x.com").await?;
        AuditLog::delete(&mut *tx, "a@x.com").await?;
        crate::watchlist::repo::WatchlistItem::delete_all_for_email(&mut *tx, "a@x.com").await?;
        User::delete(&mut *tx, "a@x.com").await?;
        tx.commit().await?;
        Ok(())
    }

    #[test]
    fn cascade_composes_inside_one_transaction() {
        // compiling is the assertion; the future is never polled without a db
        let _ = cascade_shares_one_transaction;
    }
}
