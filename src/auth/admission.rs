use axum::extract::FromRef;
use tracing::{debug, warn};

use crate::auth::jwt::SessionKeys;
use crate::error::ApiError;
use crate::sessions::{ActiveSession, MAX_ACTIVE_SESSIONS};
use crate::state::AppState;

/// Outcome of the admission check run before any login-family handler.
#[derive(Debug)]
pub enum Admission {
    /// The presented cookie matches a live session; short-circuit with 200
    /// instead of creating a duplicate.
    AlreadyLoggedIn(ActiveSession),
    /// Under the cap; continue into the actual login logic.
    Proceed,
    /// The pruned working set is at the cap and no session matched.
    CapReached,
}

/// Decides admission over an already-fetched working set. Sessions whose
/// token fails verification are returned separately as stale; the live set
/// is a filtered copy, never mutated in place while scanning.
pub fn evaluate<F>(
    sessions: Vec<ActiveSession>,
    is_valid: F,
    presented: Option<&str>,
) -> (Admission, Vec<ActiveSession>)
where
    F: Fn(&str) -> bool,
{
    let (live, stale): (Vec<_>, Vec<_>) = sessions.into_iter().partition(|s| is_valid(&s.token));

    if let Some(token) = presented {
        if let Some(matched) = live.iter().find(|s| s.token == token) {
            return (Admission::AlreadyLoggedIn(matched.clone()), stale);
        }
        // Unknown cookie: fall through as if none had been presented
    }

    if live.len() >= MAX_ACTIVE_SESSIONS {
        (Admission::CapReached, stale)
    } else {
        (Admission::Proceed, stale)
    }
}

/// Admission gate for `login`, `register` and `googleLogin`: fetch the
/// user's sessions, lazily prune the stale ones, then apply the cap/match
/// decision. A failed fetch is an infrastructure error; individual prune
/// failures are swallowed.
pub async fn admit(
    state: &AppState,
    email: &str,
    presented: Option<&str>,
) -> Result<Admission, ApiError> {
    let sessions = ActiveSession::list_by_email(&state.db, email)
        .await
        .map_err(ApiError::store)?;

    let keys = SessionKeys::from_ref(state);
    let (admission, stale) = evaluate(sessions, |token| keys.verify(token).is_ok(), presented);

    for session in &stale {
        if let Err(e) = ActiveSession::delete_by_token(&state.db, &session.token).await {
            warn!(error = %e, email = %email, "stale session prune failed");
        }
    }
    if !stale.is_empty() {
        debug!(email = %email, pruned = stale.len(), "stale sessions pruned at admission");
    }

    if let Admission::AlreadyLoggedIn(session) = &admission {
        if let Err(e) = ActiveSession::touch(&state.db, &session.token).await {
            warn!(error = %e, email = %email, "session touch failed at admission");
        }
    }

    Ok(admission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn session(token: &str) -> ActiveSession {
        ActiveSession {
            id: Uuid::new_v4(),
            token: token.to_string(),
            email: "alice@example.com".into(),
            browser: "Firefox".into(),
            os: "Linux".into(),
            last_active: OffsetDateTime::now_utc(),
        }
    }

    fn five_sessions() -> Vec<ActiveSession> {
        ["t1", "t2", "t3", "t4", "t5"].map(session).to_vec()
    }

    #[test]
    fn five_valid_sessions_and_no_cookie_hits_the_cap() {
        let (admission, stale) = evaluate(five_sessions(), |_| true, None);
        assert!(matches!(admission, Admission::CapReached));
        assert!(stale.is_empty());
    }

    #[test]
    fn under_the_cap_proceeds_to_login() {
        let sessions = vec![session("t1"), session("t2")];
        let (admission, stale) = evaluate(sessions, |_| true, None);
        assert!(matches!(admission, Admission::Proceed));
        assert!(stale.is_empty());
    }

    #[test]
    fn stale_session_is_pruned_and_frees_a_slot() {
        // t3 has an expired token; the same sixth login now proceeds
        let (admission, stale) = evaluate(five_sessions(), |t| t != "t3", None);
        assert!(matches!(admission, Admission::Proceed));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].token, "t3");
    }

    #[test]
    fn matching_cookie_short_circuits_even_at_the_cap() {
        let (admission, _) = evaluate(five_sessions(), |_| true, Some("t2"));
        match admission {
            Admission::AlreadyLoggedIn(s) => assert_eq!(s.token, "t2"),
            other => panic!("expected AlreadyLoggedIn, got {other:?}"),
        }
    }

    #[test]
    fn unknown_cookie_is_treated_as_absent() {
        let sessions = vec![session("t1")];
        let (admission, _) = evaluate(sessions, |_| true, Some("not-mine"));
        assert!(matches!(admission, Admission::Proceed));
    }

    #[test]
    fn stale_cookie_does_not_match_its_own_dead_session() {
        // The presented token exists in the store but fails verification:
        // it must be pruned, not treated as a live match
        let sessions = vec![session("t1"), session("t2")];
        let (admission, stale) = evaluate(sessions, |t| t != "t2", Some("t2"));
        assert!(matches!(admission, Admission::Proceed));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].token, "t2");
    }

    #[test]
    fn all_sessions_stale_resets_the_count() {
        let (admission, stale) = evaluate(five_sessions(), |_| false, None);
        assert!(matches!(admission, Admission::Proceed));
        assert_eq!(stale.len(), 5);
    }
}
