use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// One logged-in device/browser instance. At most 5 per user, enforced at
/// admission time; stale rows are pruned lazily when their token fails
/// verification.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActiveSession {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub token: String,
    pub email: String,
    pub browser: String,
    pub os: String,
    pub last_active: OffsetDateTime,
}

impl ActiveSession {
    pub async fn create(
        db: &PgPool,
        token: &str,
        email: &str,
        browser: &str,
        os: &str,
    ) -> anyhow::Result<ActiveSession> {
        let session = sqlx::query_as::<_, ActiveSession>(
            r#"
            INSERT INTO active_sessions (token, email, browser, os)
            VALUES ($1, $2, $3, $4)
            RETURNING id, token, email, browser, os, last_active
            "#,
        )
        .bind(token)
        .bind(email)
        .bind(browser)
        .bind(os)
        .fetch_one(db)
        .await?;
        Ok(session)
    }

    pub async fn find_by_token(db: &PgPool, token: &str) -> anyhow::Result<Option<ActiveSession>> {
        let session = sqlx::query_as::<_, ActiveSession>(
            r#"
            SELECT id, token, email, browser, os, last_active
            FROM active_sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(session)
    }

    pub async fn list_by_email(db: &PgPool, email: &str) -> anyhow::Result<Vec<ActiveSession>> {
        let sessions = sqlx::query_as::<_, ActiveSession>(
            r#"
            SELECT id, token, email, browser, os, last_active
            FROM active_sessions
            WHERE email = $1
            ORDER BY last_active DESC
            "#,
        )
        .bind(email)
        .fetch_all(db)
        .await?;
        Ok(sessions)
    }

    pub async fn touch(db: &PgPool, token: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE active_sessions SET last_active = now() WHERE token = $1"#)
            .bind(token)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn delete_by_token(db: &PgPool, token: &str) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM active_sessions WHERE token = $1"#)
            .bind(token)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn delete_all_for_email(db: impl PgExecutor<'_>, email: &str) -> anyhow::Result<u64> {
        let result = sqlx::query(r#"DELETE FROM active_sessions WHERE email = $1"#)
            .bind(email)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_session_never_exposes_the_token() {
        let session = ActiveSession {
            id: Uuid::new_v4(),
            token: "jwt-goes-here".into(),
            email: "a@x.com".into(),
            browser: "Firefox".into(),
            os: "Linux".into(),
            last_active: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["browser"], "Firefox");
        assert_eq!(json["os"], "Linux");
    }
}
