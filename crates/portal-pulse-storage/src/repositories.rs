// Repository layer for database operations
//
// Timestamps are stored as RFC 3339 text in UTC, so range filters can
// compare them as strings and date() can bucket them by day.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a database from a URL (e.g. `sqlite://activity.db?mode=rwc`),
    /// creating the file if needed
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        tracing::debug!(url = %database_url, "Opened SQLite pool");
        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection that is never
    /// recycled, since every new connection would see an empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Close every pooled connection. Waits for in-flight queries.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ============================================
    // Activity logs (append-only)
    // ============================================

    pub async fn create_activity_log(&self, input: CreateActivityLogRow) -> Result<ActivityLogRow> {
        let row = sqlx::query_as::<_, ActivityLogRow>(
            r#"
            INSERT INTO activity_logs (event_kind, subject_id, actor_class, occurred_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, event_kind, subject_id, actor_class, occurred_at
            "#,
        )
        .bind(&input.event_kind)
        .bind(&input.subject_id)
        .bind(&input.actor_class)
        .bind(input.occurred_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_activity_logs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityLogRow>> {
        let rows = sqlx::query_as::<_, ActivityLogRow>(
            r#"
            SELECT id, event_kind, subject_id, actor_class, occurred_at
            FROM activity_logs
            WHERE occurred_at >= ?1 AND occurred_at < ?2
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_activity_by_kind_and_actor(
        &self,
        event_kind: &str,
        actor_class: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM activity_logs
            WHERE event_kind = ?1
              AND actor_class = ?2
              AND occurred_at >= ?3 AND occurred_at < ?4
            "#,
        )
        .bind(event_kind)
        .bind(actor_class)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn count_activity_by_kind_per_day(
        &self,
        event_kind: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyCountRow>> {
        let rows = sqlx::query_as::<_, DailyCountRow>(
            r#"
            SELECT date(occurred_at) AS day, COUNT(*) AS count
            FROM activity_logs
            WHERE event_kind = ?1
              AND occurred_at >= ?2 AND occurred_at < ?3
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(event_kind)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_activity_by_subject(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SubjectCountRow>> {
        let rows = sqlx::query_as::<_, SubjectCountRow>(
            r#"
            SELECT subject_id, MIN(event_kind) AS event_kind, COUNT(*) AS count
            FROM activity_logs
            WHERE occurred_at >= ?1 AND occurred_at < ?2
            GROUP BY subject_id
            ORDER BY subject_id ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
