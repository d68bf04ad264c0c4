use axum_extra::extract::cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};

pub const SESSION_COOKIE: &str = "session_token";

const SESSION_COOKIE_MAX_AGE: Duration = Duration::days(7);

fn base(value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::None);
    cookie.set_path("/");
    cookie
}

/// Session cookie set on login/registration.
pub fn issue(token: String) -> Cookie<'static> {
    let mut cookie = base(token);
    cookie.set_max_age(SESSION_COOKIE_MAX_AGE);
    cookie
}

/// Expired twin of the session cookie, sent when the token is invalidated.
pub fn clear() -> Cookie<'static> {
    let mut cookie = base(String::new());
    cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_cookie_carries_the_required_flags() {
        let cookie = issue("tok".into());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn cleared_cookie_keeps_flags_and_drops_the_value() {
        let cookie = clear();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert!(cookie.max_age().is_none());
        assert!(cookie.expires().is_some());
    }
}
