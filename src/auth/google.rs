use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;

/// Subset of the Google userinfo response this service consumes.
#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Resolves a Google access token to the holder's profile via the userinfo
/// endpoint. A 401/403 from Google means the token is bad; anything else
/// that fails is an upstream error.
pub async fn resolve_access_token(
    userinfo_url: &str,
    access_token: &str,
) -> Result<GoogleProfile, ApiError> {
    let response = reqwest::Client::new()
        .get(userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ApiError::UpstreamTimeout(e.into())
            } else {
                ApiError::Upstream(e.into())
            }
        })?;

    let status = response.status();
    if status.is_client_error() {
        return Err(ApiError::Unauthorized("Invalid Google access token.".into()));
    }
    if !status.is_success() {
        return Err(ApiError::Upstream(anyhow::anyhow!(
            "google userinfo returned {status}"
        )));
    }

    let mut profile: GoogleProfile = response
        .json()
        .await
        .map_err(|e| ApiError::Upstream(e.into()))?;
    profile.email = profile.email.trim().to_lowercase();
    debug!(email = %profile.email, "google access token resolved");
    Ok(profile)
}
