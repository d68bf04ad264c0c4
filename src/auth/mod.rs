use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::state::AppState;

pub mod admission;
pub mod cookie;
pub mod dto;
pub mod google;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod password;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/registerOtpGeneration", post(handlers::register_otp_generation))
        .route("/register", post(handlers::register))
        .route("/googleLogin", post(handlers::google_login))
        .route(
            "/forgotPasswordOtpGeneration",
            post(handlers::forgot_password_otp_generation),
        )
        .route("/verifyOtp", post(handlers::verify_otp))
        .route("/setNewPassword", patch(handlers::set_new_password))
        .route("/logoutSession", post(handlers::logout_session))
        .route("/logoutAllSessions", post(handlers::logout_all_sessions))
        .route("/checkToken", get(handlers::check_token))
}
