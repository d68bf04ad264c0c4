use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

/// User as returned to the client: everything except the password hash.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub registered_via: String,
    pub risk_profile: Option<String>,
    pub investment_experience: Option<String>,
    pub financial_goals: Option<String>,
    pub horizon: Option<String>,
    pub theme: String,
    pub dashboard_layout: String,
    pub ai_suggestions: bool,
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            registered_via: user.registered_via,
            risk_profile: user.risk_profile,
            investment_experience: user.investment_experience,
            financial_goals: user.financial_goals,
            horizon: user.horizon,
            theme: user.theme,
            dashboard_layout: user.dashboard_layout,
            ai_suggestions: user.ai_suggestions,
            image_url: user.image_url,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_never_serializes_the_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            name: "Alice".into(),
            password_hash: Some("$argon2id$secret".into()),
            registered_via: "normal".into(),
            risk_profile: None,
            investment_experience: None,
            financial_goals: None,
            horizon: None,
            theme: "dark".into(),
            dashboard_layout: "compact".into(),
            ai_suggestions: true,
            image_url: "https://static.stockpulse.app/avatars/default.png".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["theme"], "dark");
    }
}
