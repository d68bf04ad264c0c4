use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::SET_COOKIE, request::Parts, HeaderValue},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::auth::cookie::{self, SESSION_COOKIE};
use crate::auth::jwt::{SessionKeys, TokenError};
use crate::error::ApiError;
use crate::sessions::ActiveSession;
use crate::state::AppState;
use crate::users::repo::User;

/// Hydrated caller context for protected routes: the owning user plus the
/// device/browser fingerprint of the session making the request. Extraction
/// refreshes the session's last-active timestamp as a side effect.
pub struct AuthSession {
    pub user: User,
    pub session: ActiveSession,
}

fn reject(err: ApiError, clear_cookie: bool) -> Response {
    let mut response = err.into_response();
    if clear_cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie::clear().to_string()) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Err(reject(
                ApiError::Unauthorized("No session token provided.".into()),
                false,
            ));
        };

        let session = match ActiveSession::find_by_token(&state.db, &token).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                // Unknown token: the cookie itself is the invalidated artifact
                return Err(reject(
                    ApiError::Unauthorized("Session not found. Please log in again.".into()),
                    true,
                ));
            }
            Err(e) => return Err(reject(ApiError::store(e), false)),
        };

        let keys = SessionKeys::from_ref(state);
        let claims = match keys.verify(&token) {
            Ok(claims) => claims,
            Err(kind) => {
                if let Err(e) = ActiveSession::delete_by_token(&state.db, &token).await {
                    warn!(error = %e, "failed to prune session with bad token");
                }
                let err = match kind {
                    TokenError::Expired => ApiError::TokenExpired,
                    TokenError::Invalid => {
                        ApiError::Unauthorized("Invalid session token.".into())
                    }
                };
                return Err(reject(err, true));
            }
        };

        let user = match User::find_by_email(&state.db, &claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return Err(reject(
                    ApiError::Gone("This account no longer exists.".into()),
                    true,
                ));
            }
            Err(e) => return Err(reject(ApiError::store(e), false)),
        };

        if let Err(e) = ActiveSession::touch(&state.db, &token).await {
            warn!(error = %e, email = %user.email, "session touch failed");
        }

        Ok(AuthSession { user, session })
    }
}
