// Database-backed ActivityLogStore implementation
//
// This module implements the core ActivityLogStore trait on top of the
// activity_logs table.

use async_trait::async_trait;
use chrono::NaiveDate;
use portal_pulse_core::{
    ActivityLogEntry, ActivityLogStore, ActivityWindow, ActorClass, DailyCount,
    NewActivityLogEntry, PulseError, Result, SubjectActivity,
};

use crate::models::{ActivityLogRow, CreateActivityLogRow};
use crate::repositories::Database;

// ============================================================================
// DbActivityLog - Stores activity entries in the database
// ============================================================================

/// Database-backed activity log
#[derive(Clone)]
pub struct DbActivityLog {
    db: Database,
}

impl DbActivityLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Entries within a window, ordered by (occurred_at, id)
    pub async fn list(&self, window: ActivityWindow) -> Result<Vec<ActivityLogEntry>> {
        self.db
            .list_activity_logs(window.start, window.end)
            .await
            .map_err(|e| PulseError::storage(e.to_string()))?
            .into_iter()
            .map(row_to_entry)
            .collect()
    }
}

fn row_to_entry(row: ActivityLogRow) -> Result<ActivityLogEntry> {
    Ok(ActivityLogEntry {
        id: row.id,
        event_kind: row.event_kind,
        subject_id: row.subject_id,
        actor_class: row
            .actor_class
            .parse::<ActorClass>()
            .map_err(|e| PulseError::storage(e.to_string()))?,
        occurred_at: row.occurred_at,
    })
}

#[async_trait]
impl ActivityLogStore for DbActivityLog {
    async fn insert(&self, entry: NewActivityLogEntry) -> Result<ActivityLogEntry> {
        let row = self
            .db
            .create_activity_log(CreateActivityLogRow {
                event_kind: entry.event_kind,
                subject_id: entry.subject_id,
                actor_class: entry.actor_class.to_string(),
                occurred_at: entry.occurred_at,
            })
            .await
            .map_err(|e| PulseError::storage(e.to_string()))?;

        row_to_entry(row)
    }

    async fn count_by_kind_and_actor(
        &self,
        window: ActivityWindow,
        event_kind: &str,
        actor_class: ActorClass,
    ) -> Result<i64> {
        self.db
            .count_activity_by_kind_and_actor(
                event_kind,
                actor_class.as_str(),
                window.start,
                window.end,
            )
            .await
            .map_err(|e| PulseError::storage(e.to_string()))
    }

    async fn count_by_kind_per_day(
        &self,
        window: ActivityWindow,
        event_kind: &str,
    ) -> Result<Vec<DailyCount>> {
        let rows = self
            .db
            .count_activity_by_kind_per_day(event_kind, window.start, window.end)
            .await
            .map_err(|e| PulseError::storage(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let day = NaiveDate::parse_from_str(&row.day, "%Y-%m-%d").map_err(|e| {
                    PulseError::storage(format!("invalid day bucket {:?}: {e}", row.day))
                })?;
                Ok(DailyCount {
                    day,
                    count: row.count,
                })
            })
            .collect()
    }

    async fn count_grouped_by_subject(
        &self,
        window: ActivityWindow,
    ) -> Result<Vec<SubjectActivity>> {
        let rows = self
            .db
            .count_activity_by_subject(window.start, window.end)
            .await
            .map_err(|e| PulseError::storage(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| SubjectActivity {
                subject_id: row.subject_id,
                event_kind: row.event_kind,
                count: row.count,
            })
            .collect())
    }
}

// ============================================================================
// Factory functions
// ============================================================================

/// Open the database at `database_url`, apply migrations and wrap it as
/// an activity log
pub async fn open_db_activity_log(database_url: &str) -> anyhow::Result<DbActivityLog> {
    let db = Database::from_url(database_url).await?;
    db.migrate().await?;
    Ok(DbActivityLog::new(db))
}

// ============================================================================
// Tests
// ============================================================================
