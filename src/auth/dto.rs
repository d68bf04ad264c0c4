use serde::{Deserialize, Serialize};

use crate::users::dto::PublicUser;

fn unknown_label() -> String {
    "Unknown".into()
}

/// Request body for password login. Browser/OS labels come from the client
/// and default to "Unknown" when absent.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default = "unknown_label")]
    pub browser: String,
    #[serde(default = "unknown_label")]
    pub os: String,
}

/// Starts the OTP registration flow. The password is hashed up front and
/// parked in the OTP ledger until the code is verified.
#[derive(Debug, Deserialize)]
pub struct RegisterOtpRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Completes registration after the OTP has been verified.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default = "unknown_label")]
    pub browser: String,
    #[serde(default = "unknown_label")]
    pub os: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub access_token: String,
    #[serde(default = "unknown_label")]
    pub browser: String,
    #[serde(default = "unknown_label")]
    pub os: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct SetNewPasswordRequest {
    pub email: String,
    pub new_password: String,
}

/// Response for login, register and google login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: PublicUser,
}
