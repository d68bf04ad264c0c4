use tracing::warn;

use crate::audit::repo::{AuditEntry, AuditLog};
use crate::state::AppState;

/// Best-effort audit writes, dispatched off the request path once the
/// primary response is prepared. Failures are logged and dropped; they
/// never surface to the caller.
pub fn record_activity(state: &AppState, email: &str, entry: AuditEntry) {
    let db = state.db.clone();
    let email = email.to_string();
    tokio::spawn(async move {
        if let Err(e) = AuditLog::append_activity(&db, &email, entry).await {
            warn!(error = %e, email = %email, "activity history write failed");
        }
    });
}

pub fn record_alert(state: &AppState, email: &str, entry: AuditEntry) {
    let db = state.db.clone();
    let email = email.to_string();
    tokio::spawn(async move {
        if let Err(e) = AuditLog::append_alert(&db, &email, entry).await {
            warn!(error = %e, email = %email, "security alert write failed");
        }
    });
}
