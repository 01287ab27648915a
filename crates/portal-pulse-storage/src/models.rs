// Database models (internal, may differ from public DTOs)

use chrono::{DateTime, Utc};
use sqlx::FromRow;

// ============================================
// Activity log models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct ActivityLogRow {
    pub id: i64,
    pub event_kind: String,
    pub subject_id: String,
    pub actor_class: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateActivityLogRow {
    pub event_kind: String,
    pub subject_id: String,
    pub actor_class: String,
    pub occurred_at: DateTime<Utc>,
}

/// One row of the per-day count query. `day` is `YYYY-MM-DD` (UTC).
#[derive(Debug, Clone, FromRow)]
pub struct DailyCountRow {
    pub day: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SubjectCountRow {
    pub subject_id: String,
    pub event_kind: String,
    pub count: i64,
}
