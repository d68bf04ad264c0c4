use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WatchlistItem {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub email: String,
    pub symbol: String,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}

impl WatchlistItem {
    pub async fn list_by_email(db: &PgPool, email: &str) -> anyhow::Result<Vec<WatchlistItem>> {
        let items = sqlx::query_as::<_, WatchlistItem>(
            r#"
            SELECT id, email, symbol, added_at
            FROM watchlists
            WHERE email = $1
            ORDER BY added_at DESC
            "#,
        )
        .bind(email)
        .fetch_all(db)
        .await?;
        Ok(items)
    }

    /// Adding a symbol already on the list is a no-op; the existing row is
    /// returned either way.
    pub async fn add(db: &PgPool, email: &str, symbol: &str) -> anyhow::Result<WatchlistItem> {
        let item = sqlx::query_as::<_, WatchlistItem>(
            r#"
            INSERT INTO watchlists (email, symbol)
            VALUES ($1, $2)
            ON CONFLICT (email, symbol) DO UPDATE SET symbol = EXCLUDED.symbol
            RETURNING id, email, symbol, added_at
            "#,
        )
        .bind(email)
        .bind(symbol)
        .fetch_one(db)
        .await?;
        Ok(item)
    }

    pub async fn remove(db: &PgPool, email: &str, symbol: &str) -> anyhow::Result<u64> {
        let result = sqlx::query(r#"DELETE FROM watchlists WHERE email = $1 AND symbol = $2"#)
            .bind(email)
            .bind(symbol)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all_for_email(db: impl PgExecutor<'_>, email: &str) -> anyhow::Result<u64> {
        let result = sqlx::query(r#"DELETE FROM watchlists WHERE email = $1"#)
            .bind(email)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
