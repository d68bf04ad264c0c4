use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::audit::recorder;
use crate::audit::repo::AuditEntry;
use crate::auth::admission::{admit, Admission};
use crate::auth::cookie::{self, SESSION_COOKIE};
use crate::auth::dto::{
    AuthResponse, ForgotPasswordOtpRequest, GoogleLoginRequest, LoginRequest, RegisterOtpRequest,
    RegisterRequest, SetNewPasswordRequest, VerifyOtpRequest,
};
use crate::auth::google;
use crate::auth::guard::AuthSession;
use crate::auth::jwt::SessionKeys;
use crate::auth::otp::{OtpPurpose, OtpRecord, OtpVerification};
use crate::auth::password::{hash_password, password_meets_policy, verify_password};
use crate::error::ApiError;
use crate::mail::otp_mail_body;
use crate::sessions::ActiveSession;
use crate::state::AppState;
use crate::users::dto::PublicUser;
use crate::users::repo::User;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required.".into()));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email address.".into()));
    }
    Ok(email)
}

fn presented_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Signs a token, persists the session row and prepares the cookie.
async fn open_session(
    state: &AppState,
    email: &str,
    browser: &str,
    os: &str,
) -> Result<(String, CookieJar), ApiError> {
    let keys = SessionKeys::from_ref(state);
    let token = keys.sign(email)?;
    ActiveSession::create(&state.db, &token, email, browser, os)
        .await
        .map_err(ApiError::store)?;
    let jar = CookieJar::new().add(cookie::issue(token.clone()));
    Ok((token, jar))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let email = normalize_email(&payload.email)?;
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required.".into()));
    }

    match admit(&state, &email, presented_token(&jar).as_deref()).await? {
        Admission::AlreadyLoggedIn(_) => {
            let user = User::find_by_email(&state.db, &email)
                .await
                .map_err(ApiError::store)?
                .ok_or_else(|| ApiError::Gone("This account no longer exists.".into()))?;
            return Ok((
                StatusCode::OK,
                jar,
                Json(AuthResponse {
                    message: "Already logged in.".into(),
                    user: PublicUser::from(user),
                }),
            ));
        }
        Admission::CapReached => return Err(ApiError::SessionCap),
        Admission::Proceed => {}
    }

    let user = match User::find_by_email(&state.db, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::Unauthorized("Invalid credentials.".into()));
        }
        Err(e) => return Err(ApiError::store(e)),
    };

    let Some(hash) = user.password_hash.as_deref() else {
        return Err(ApiError::Unprocessable(
            "This account uses Google sign-in.".into(),
        ));
    };
    if !verify_password(&payload.password, hash)? {
        warn!(email = %email, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials.".into()));
    }

    let (token, jar) = open_session(&state, &email, &payload.browser, &payload.os).await?;
    recorder::record_activity(
        &state,
        &email,
        AuditEntry::new(&payload.os, &payload.browser, "login", "Logged in.", &token),
    );
    recorder::record_alert(
        &state,
        &email,
        AuditEntry::new(
            &payload.os,
            &payload.browser,
            "login",
            "New login to your account.",
            &token,
        ),
    );

    info!(email = %email, "user logged in");
    Ok((
        StatusCode::OK,
        jar,
        Json(AuthResponse {
            message: "Logged in.".into(),
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn register_otp_generation(
    State(state): State<AppState>,
    Json(payload): Json<RegisterOtpRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalize_email(&payload.email)?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required.".into()));
    }
    if !password_meets_policy(&payload.password) {
        return Err(ApiError::Unprocessable(
            "Password must be at least 8 characters with a letter and a digit.".into(),
        ));
    }

    if User::find_by_email(&state.db, &email)
        .await
        .map_err(ApiError::store)?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already registered.".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let record = OtpRecord::issue(OtpPurpose::Registration {
        name: payload.name.trim().to_string(),
        password_hash,
    });
    let code = record.code.clone();
    state.otp.add(&email, record).await;

    state
        .mailer
        .send(
            &email,
            "Verify your StockPulse registration",
            &otp_mail_body(&code, "registration"),
        )
        .await
        .map_err(ApiError::Upstream)?;

    info!(email = %email, "registration otp issued");
    Ok(Json(json!({ "message": "OTP sent to your email." })))
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let email = normalize_email(&payload.email)?;

    match admit(&state, &email, presented_token(&jar).as_deref()).await? {
        Admission::AlreadyLoggedIn(_) => {
            let user = User::find_by_email(&state.db, &email)
                .await
                .map_err(ApiError::store)?
                .ok_or_else(|| ApiError::Gone("This account no longer exists.".into()))?;
            return Ok((
                StatusCode::OK,
                jar,
                Json(AuthResponse {
                    message: "Already logged in.".into(),
                    user: PublicUser::from(user),
                }),
            ));
        }
        Admission::CapReached => return Err(ApiError::SessionCap),
        Admission::Proceed => {}
    }

    let now = time::OffsetDateTime::now_utc();
    let record = state.otp.get(&email).await;
    let Some(record) = record.filter(|r| r.is_validated(now)) else {
        return Err(ApiError::Gone(
            "OTP not verified or expired. Restart registration.".into(),
        ));
    };
    let OtpPurpose::Registration {
        name,
        password_hash,
    } = record.purpose
    else {
        return Err(ApiError::Gone(
            "OTP not verified or expired. Restart registration.".into(),
        ));
    };

    if User::find_by_email(&state.db, &email)
        .await
        .map_err(ApiError::store)?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already registered.".into()));
    }

    let user = User::create_normal(&state.db, &email, &name, &password_hash)
        .await
        .map_err(ApiError::store)?;
    state.otp.remove(&email).await;

    let (token, jar) = open_session(&state, &email, &payload.browser, &payload.os).await?;
    recorder::record_activity(
        &state,
        &email,
        AuditEntry::new(
            &payload.os,
            &payload.browser,
            "account",
            "Account created.",
            &token,
        ),
    );

    info!(email = %email, "user registered");
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            message: "Registered.".into(),
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn google_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    if payload.access_token.trim().is_empty() {
        return Err(ApiError::BadRequest("Access token is required.".into()));
    }

    let profile =
        google::resolve_access_token(&state.config.google.userinfo_url, &payload.access_token)
            .await?;
    let email = normalize_email(&profile.email)?;

    match admit(&state, &email, presented_token(&jar).as_deref()).await? {
        Admission::AlreadyLoggedIn(_) => {
            let user = User::find_by_email(&state.db, &email)
                .await
                .map_err(ApiError::store)?
                .ok_or_else(|| ApiError::Gone("This account no longer exists.".into()))?;
            return Ok((
                StatusCode::OK,
                jar,
                Json(AuthResponse {
                    message: "Already logged in.".into(),
                    user: PublicUser::from(user),
                }),
            ));
        }
        Admission::CapReached => return Err(ApiError::SessionCap),
        Admission::Proceed => {}
    }

    let existing = User::find_by_email(&state.db, &email)
        .await
        .map_err(ApiError::store)?;
    let (user, first_login) = match existing {
        Some(user) => (user, false),
        None => {
            let name = profile
                .name
                .unwrap_or_else(|| email.split('@').next().unwrap_or("investor").to_string());
            let user = User::create_google(&state.db, &email, &name)
                .await
                .map_err(ApiError::store)?;
            (user, true)
        }
    };

    let (token, jar) = open_session(&state, &email, &payload.browser, &payload.os).await?;
    recorder::record_activity(
        &state,
        &email,
        AuditEntry::new(
            &payload.os,
            &payload.browser,
            "login",
            "Logged in with Google.",
            &token,
        ),
    );

    info!(email = %email, first_login, "google login");
    Ok((
        if first_login {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        },
        jar,
        Json(AuthResponse {
            message: "Logged in.".into(),
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password_otp_generation(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordOtpRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalize_email(&payload.email)?;

    let user = User::find_by_email(&state.db, &email)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::Gone("No account with this email.".into()))?;
    if user.password_hash.is_none() {
        return Err(ApiError::Unprocessable(
            "This account uses Google sign-in and has no password.".into(),
        ));
    }

    let record = OtpRecord::issue(OtpPurpose::PasswordReset);
    let code = record.code.clone();
    state.otp.add(&email, record).await;

    state
        .mailer
        .send(
            &email,
            "Your StockPulse password reset code",
            &otp_mail_body(&code, "password reset"),
        )
        .await
        .map_err(ApiError::Upstream)?;

    info!(email = %email, "password reset otp issued");
    Ok(Json(json!({ "message": "OTP sent to your email." })))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalize_email(&payload.email)?;
    if payload.otp.trim().is_empty() {
        return Err(ApiError::BadRequest("OTP is required.".into()));
    }

    match state.otp.verify(&email, payload.otp.trim()).await {
        OtpVerification::Validated => Ok(Json(json!({ "message": "OTP verified." }))),
        OtpVerification::WrongCode { attempts_left } => Err(ApiError::Unauthorized(format!(
            "Invalid OTP.{attempts_left} attempts left."
        ))),
        OtpVerification::AlreadyValidated => {
            Err(ApiError::Gone("OTP already verified.".into()))
        }
        OtpVerification::Expired => Err(ApiError::Gone("OTP expired or invalid.".into())),
    }
}

#[instrument(skip(state, payload))]
pub async fn set_new_password(
    State(state): State<AppState>,
    Json(payload): Json<SetNewPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalize_email(&payload.email)?;
    if !password_meets_policy(&payload.new_password) {
        return Err(ApiError::Unprocessable(
            "Password must be at least 8 characters with a letter and a digit.".into(),
        ));
    }

    let now = time::OffsetDateTime::now_utc();
    let record = state.otp.get(&email).await;
    let valid_reset = record
        .as_ref()
        .map(|r| r.is_validated(now) && matches!(r.purpose, OtpPurpose::PasswordReset))
        .unwrap_or(false);
    if !valid_reset {
        return Err(ApiError::Gone("OTP expired or invalid.".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    let updated = User::update_password(&state.db, &email, &hash)
        .await
        .map_err(ApiError::store)?;
    if updated == 0 {
        return Err(ApiError::Gone("No account with this email.".into()));
    }
    state.otp.remove(&email).await;

    recorder::record_alert(
        &state,
        &email,
        AuditEntry::new("Unknown", "Unknown", "security", "Password changed.", ""),
    );

    info!(email = %email, "password reset completed");
    Ok(Json(json!({ "message": "Password updated. Please log in." })))
}

#[instrument(skip(state, auth))]
pub async fn logout_session(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    ActiveSession::delete_by_token(&state.db, &auth.session.token)
        .await
        .map_err(ApiError::store)?;

    recorder::record_activity(
        &state,
        &auth.user.email,
        AuditEntry::new(
            &auth.session.os,
            &auth.session.browser,
            "logout",
            "Logged out.",
            &auth.session.token,
        ),
    );

    let jar = CookieJar::new().add(cookie::clear());
    Ok((jar, Json(json!({ "message": "Logged out." }))))
}

#[instrument(skip(state, auth))]
pub async fn logout_all_sessions(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let removed = ActiveSession::delete_all_for_email(&state.db, &auth.user.email)
        .await
        .map_err(ApiError::store)?;

    recorder::record_alert(
        &state,
        &auth.user.email,
        AuditEntry::new(
            &auth.session.os,
            &auth.session.browser,
            "security",
            "Logged out of all devices.",
            &auth.session.token,
        ),
    );

    info!(email = %auth.user.email, removed, "all sessions closed");
    let jar = CookieJar::new().add(cookie::clear());
    Ok((jar, Json(json!({ "message": "Logged out of all devices." }))))
}

#[instrument(skip(auth))]
pub async fn check_token(auth: AuthSession) -> Json<Value> {
    Json(json!({
        "user": PublicUser::from(auth.user),
        "session": { "browser": auth.session.browser, "os": auth.session.os },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
    }

    #[test]
    fn normalize_email_rejects_missing_and_malformed_input() {
        assert!(matches!(normalize_email("   "), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            normalize_email("not-an-email"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            normalize_email("two@@example.com"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn wrong_otp_message_reports_the_exact_remaining_count() {
        let err = ApiError::Unauthorized(format!("Invalid OTP.{} attempts left.", 2));
        assert_eq!(err.to_string(), "Invalid OTP.2 attempts left.");
    }
}
