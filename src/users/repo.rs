use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const REGISTERED_NORMAL: &str = "normal";
pub const REGISTERED_GOOGLE: &str = "google";

const USER_COLUMNS: &str = "id, email, name, password_hash, registered_via, risk_profile, \
     investment_experience, financial_goals, horizon, theme, dashboard_layout, \
     ai_suggestions, image_url, created_at";

/// Identity record. Exactly one row per normalized (lowercased) email.
/// OAuth-only accounts carry no password hash.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub registered_via: String,
    pub risk_profile: Option<String>,
    pub investment_experience: Option<String>,
    pub financial_goals: Option<String>,
    pub horizon: Option<String>,
    pub theme: String,
    pub dashboard_layout: String,
    pub ai_suggestions: bool,
    pub image_url: String,
    pub created_at: OffsetDateTime,
}

/// Profile fields patchable by the owner. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub risk_profile: Option<String>,
    pub investment_experience: Option<String>,
    pub financial_goals: Option<String>,
    pub horizon: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreferencesPatch {
    pub theme: Option<String>,
    pub dashboard_layout: Option<String>,
    pub ai_suggestions: Option<bool>,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create_normal(
        db: &PgPool,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password_hash, registered_via)
             VALUES ($1, $2, $3, '{REGISTERED_NORMAL}')
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn create_google(db: &PgPool, email: &str, name: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, registered_via)
             VALUES ($1, $2, '{REGISTERED_GOOGLE}')
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(name)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn update_password(db: &PgPool, email: &str, hash: &str) -> anyhow::Result<u64> {
        let result = sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE email = $1"#)
            .bind(email)
            .bind(hash)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_profile(
        db: &PgPool,
        email: &str,
        patch: &ProfilePatch,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                 name = COALESCE($2, name),
                 risk_profile = COALESCE($3, risk_profile),
                 investment_experience = COALESCE($4, investment_experience),
                 financial_goals = COALESCE($5, financial_goals),
                 horizon = COALESCE($6, horizon),
                 image_url = COALESCE($7, image_url)
             WHERE email = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(&patch.name)
        .bind(&patch.risk_profile)
        .bind(&patch.investment_experience)
        .bind(&patch.financial_goals)
        .bind(&patch.horizon)
        .bind(&patch.image_url)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn update_preferences(
        db: &PgPool,
        email: &str,
        patch: &PreferencesPatch,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                 theme = COALESCE($2, theme),
                 dashboard_layout = COALESCE($3, dashboard_layout),
                 ai_suggestions = COALESCE($4, ai_suggestions)
             WHERE email = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(&patch.theme)
        .bind(&patch.dashboard_layout)
        .bind(patch.ai_suggestions)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn delete(db: impl PgExecutor<'_>, email: &str) -> anyhow::Result<u64> {
        let result = sqlx::query(r#"DELETE FROM users WHERE email = $1"#)
            .bind(email)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
