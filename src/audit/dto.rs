use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::audit::repo::AuditEntry;
use crate::sessions::ActiveSession;

/// Audit entry as shown to the user: the originating session token is
/// stripped.
#[derive(Debug, Serialize)]
pub struct PublicAuditEntry {
    pub os: String,
    pub browser: String,
    pub category: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<AuditEntry> for PublicAuditEntry {
    fn from(entry: AuditEntry) -> Self {
        Self {
            os: entry.os,
            browser: entry.browser,
            category: entry.category,
            message: entry.message,
            created_at: entry.created_at,
        }
    }
}

/// Session as shown in the device list: token stripped, the caller's own
/// session flagged.
#[derive(Debug, Serialize)]
pub struct PublicSession {
    pub id: Uuid,
    pub browser: String,
    pub os: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active: OffsetDateTime,
    pub current: bool,
}

impl PublicSession {
    pub fn from_session(session: ActiveSession, current_token: &str) -> Self {
        Self {
            id: session.id,
            browser: session.browser,
            os: session.os,
            last_active: session.last_active,
            current: session.token == current_token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub activity: Vec<PublicAuditEntry>,
    pub sessions: Vec<PublicSession>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub activity: Vec<PublicAuditEntry>,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<PublicAuditEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_entry_strips_the_token() {
        let entry = AuditEntry::new("Linux", "Firefox", "login", "Logged in", "secret-token");
        let public = PublicAuditEntry::from(entry);
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["message"], "Logged in");
    }

    #[test]
    fn public_session_strips_token_and_flags_the_caller() {
        let session = ActiveSession {
            id: Uuid::new_v4(),
            token: "secret-token".into(),
            email: "a@x.com".into(),
            browser: "Firefox".into(),
            os: "Linux".into(),
            last_active: OffsetDateTime::now_utc(),
        };
        let public = PublicSession::from_session(session.clone(), "secret-token");
        assert!(public.current);
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["browser"], "Firefox");
        assert_eq!(json["os"], "Linux");

        let other = PublicSession::from_session(session, "different-token");
        assert!(!other.current);
    }
}
