use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, PgPool};
use time::OffsetDateTime;

/// Most-recent-first caps on the per-user audit lists.
pub const SECURITY_ALERT_CAP: usize = 50;
pub const ACTIVITY_CAP: usize = 100;

/// One audit record: who did what, from which device. Never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub os: String,
    pub browser: String,
    pub category: String,
    pub message: String,
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AuditEntry {
    pub fn new(
        os: impl Into<String>,
        browser: impl Into<String>,
        category: impl Into<String>,
        message: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            os: os.into(),
            browser: browser.into(),
            category: category.into(),
            message: message.into(),
            token: token.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Bounded front-push as one statement: the new entry is concatenated in
/// front of the stored list and sliced to the cap inside the upsert itself,
/// so two concurrent appends to the same document cannot lose an entry.
fn capped_upsert_sql(column: &str, cap: usize) -> String {
    format!(
        "INSERT INTO audit_logs (email, {column}, updated_at) \
         VALUES ($1, $2, now()) \
         ON CONFLICT (email) DO UPDATE SET \
         {column} = jsonb_path_query_array($2::jsonb || audit_logs.{column}, '$[0 to {last}]'), \
         updated_at = now()",
        last = cap - 1
    )
}

#[derive(FromRow)]
struct AuditRow {
    security_alerts: Json<Vec<AuditEntry>>,
    activity_history: Json<Vec<AuditEntry>>,
}

/// One JSONB document per email holding both bounded lists. Every operation
/// touches a single row.
pub struct AuditLog;

impl AuditLog {
    /// Returns `(security_alerts, activity_history)`, empty when no
    /// document exists yet.
    pub async fn lists(
        db: &PgPool,
        email: &str,
    ) -> anyhow::Result<(Vec<AuditEntry>, Vec<AuditEntry>)> {
        let row = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT security_alerts, activity_history
            FROM audit_logs
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(match row {
            Some(row) => (row.security_alerts.0, row.activity_history.0),
            None => (Vec::new(), Vec::new()),
        })
    }

    async fn append(
        db: &PgPool,
        email: &str,
        entry: AuditEntry,
        column: &str,
        cap: usize,
    ) -> anyhow::Result<()> {
        sqlx::query(&capped_upsert_sql(column, cap))
            .bind(email)
            .bind(Json(vec![entry]))
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn append_alert(db: &PgPool, email: &str, entry: AuditEntry) -> anyhow::Result<()> {
        Self::append(db, email, entry, "security_alerts", SECURITY_ALERT_CAP).await
    }

    pub async fn append_activity(
        db: &PgPool,
        email: &str,
        entry: AuditEntry,
    ) -> anyhow::Result<()> {
        Self::append(db, email, entry, "activity_history", ACTIVITY_CAP).await
    }

    pub async fn clear_alerts(db: &PgPool, email: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE audit_logs SET security_alerts = '[]', updated_at = now() WHERE email = $1"#,
        )
        .bind(email)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn clear_activity(db: &PgPool, email: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE audit_logs SET activity_history = '[]', updated_at = now() WHERE email = $1"#,
        )
        .bind(email)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Account-deletion cascade: drops the whole document.
    pub async fn delete(db: impl PgExecutor<'_>, email: &str) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM audit_logs WHERE email = $1"#)
            .bind(email)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_append_is_a_single_statement() {
        let sql = capped_upsert_sql("security_alerts", SECURITY_ALERT_CAP);
        // no read-modify-write: one upsert, no separate SELECT
        assert!(sql.starts_with("INSERT INTO audit_logs"));
        assert!(sql.contains("ON CONFLICT (email) DO UPDATE"));
        assert!(!sql.contains(';'));
        assert!(!sql.contains("SELECT"));
    }

    #[test]
    fn alert_append_prepends_and_caps_at_fifty() {
        let sql = capped_upsert_sql("security_alerts", SECURITY_ALERT_CAP);
        // new entry lands in front, slice keeps indexes 0..=49
        assert!(sql.contains("$2::jsonb || audit_logs.security_alerts"));
        assert!(sql.contains("'$[0 to 49]'"));
    }

    #[test]
    fn activity_append_caps_at_one_hundred() {
        let sql = capped_upsert_sql("activity_history", ACTIVITY_CAP);
        assert!(sql.contains("$2::jsonb || audit_logs.activity_history"));
        assert!(sql.contains("'$[0 to 99]'"));
    }
}
