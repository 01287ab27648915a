// Core traits for pluggable backends
//
// These traits keep classification and aggregation independent of
// where entries live and how actors are resolved:
// - In-memory implementations for tests and dev mode
// - Database implementations for production
// - HTTP implementation of the actor registry

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::activity::{
    ActivityLogEntry, ActivityWindow, ActorClass, DailyCount, NewActivityLogEntry,
    SubjectActivity,
};
use crate::error::Result;
use crate::registry::ActorRecord;

// ============================================================================
// ActivityLogStore - Append-only activity log
// ============================================================================

/// Trait for persisting activity log entries and running windowed reads
///
/// There is no update or delete path: entries are immutable once inserted.
#[async_trait]
pub trait ActivityLogStore: Send + Sync {
    /// Persist one entry and return it with its assigned id
    async fn insert(&self, entry: NewActivityLogEntry) -> Result<ActivityLogEntry>;

    /// Count entries with the given kind and actor class. Zero when none match.
    async fn count_by_kind_and_actor(
        &self,
        window: ActivityWindow,
        event_kind: &str,
        actor_class: ActorClass,
    ) -> Result<i64>;

    /// Daily counts for one kind, ascending by calendar day (UTC).
    /// Days without entries are not returned.
    async fn count_by_kind_per_day(
        &self,
        window: ActivityWindow,
        event_kind: &str,
    ) -> Result<Vec<DailyCount>>;

    /// Entry count per distinct subject id
    async fn count_grouped_by_subject(&self, window: ActivityWindow)
        -> Result<Vec<SubjectActivity>>;
}

// ============================================================================
// ActorRegistry - External directory of portal clients
// ============================================================================

/// Trait for resolving a subject id against the client directory
///
/// `Ok` means the directory knows the subject, even if the record carries
/// no name fields. Any failure (not found, transport, decode) is `Err`.
#[async_trait]
pub trait ActorRegistry: Send + Sync {
    async fn lookup(&self, subject_id: &str) -> Result<ActorRecord>;
}

// ============================================================================
// Clock - Source of "now" for classification and windows
// ============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
