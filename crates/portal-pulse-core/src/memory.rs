// In-memory implementations for dev mode and testing
//
// These implementations keep all data in memory, making them perfect for:
// - Running the service without a database file (STORAGE_BACKEND=memory)
// - Unit tests of the classifier and aggregation engine
// - Quick prototyping

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::activity::{
    ActivityLogEntry, ActivityWindow, ActorClass, DailyCount, NewActivityLogEntry,
    SubjectActivity,
};
use crate::error::{PulseError, Result};
use crate::registry::ActorRecord;
use crate::traits::{ActivityLogStore, ActorRegistry, Clock};

// ============================================================================
// InMemoryActivityLog - Stores entries in a Vec
// ============================================================================

/// In-memory activity log
///
/// Entries are kept in insertion order; ids start at 1.
#[derive(Debug, Default, Clone)]
pub struct InMemoryActivityLog {
    entries: Arc<RwLock<Vec<ActivityLogEntry>>>,
}

impl InMemoryActivityLog {
    /// Create a new, empty activity log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry, ordered by (occurred_at, id)
    pub async fn entries(&self) -> Vec<ActivityLogEntry> {
        let mut entries = self.entries.read().await.clone();
        entries.sort_by_key(|e| (e.occurred_at, e.id));
        entries
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn in_window(&self, window: ActivityWindow) -> Vec<ActivityLogEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| window.contains(e.occurred_at))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ActivityLogStore for InMemoryActivityLog {
    async fn insert(&self, entry: NewActivityLogEntry) -> Result<ActivityLogEntry> {
        let mut entries = self.entries.write().await;
        let id = entries.last().map(|e| e.id + 1).unwrap_or(1);
        let stored = ActivityLogEntry::from_new(id, entry);
        entries.push(stored.clone());
        Ok(stored)
    }

    async fn count_by_kind_and_actor(
        &self,
        window: ActivityWindow,
        event_kind: &str,
        actor_class: ActorClass,
    ) -> Result<i64> {
        let count = self
            .in_window(window)
            .await
            .iter()
            .filter(|e| e.event_kind == event_kind && e.actor_class == actor_class)
            .count();
        Ok(count as i64)
    }

    async fn count_by_kind_per_day(
        &self,
        window: ActivityWindow,
        event_kind: &str,
    ) -> Result<Vec<DailyCount>> {
        let mut days = BTreeMap::new();
        for entry in self.in_window(window).await {
            if entry.event_kind == event_kind {
                *days.entry(entry.occurred_at.date_naive()).or_insert(0_i64) += 1;
            }
        }
        Ok(days
            .into_iter()
            .map(|(day, count)| DailyCount { day, count })
            .collect())
    }

    async fn count_grouped_by_subject(
        &self,
        window: ActivityWindow,
    ) -> Result<Vec<SubjectActivity>> {
        let mut groups: BTreeMap<String, SubjectActivity> = BTreeMap::new();
        for entry in self.in_window(window).await {
            let group = groups
                .entry(entry.subject_id.clone())
                .or_insert_with(|| SubjectActivity {
                    subject_id: entry.subject_id.clone(),
                    event_kind: entry.event_kind.clone(),
                    count: 0,
                });
            group.count += 1;
            if entry.event_kind < group.event_kind {
                group.event_kind = entry.event_kind;
            }
        }
        Ok(groups.into_values().collect())
    }
}

// ============================================================================
// InMemoryActorRegistry - Static directory of client records
// ============================================================================

/// In-memory actor registry
///
/// Subjects that were never added fail the lookup. Every call is counted,
/// including failed ones.
#[derive(Debug, Default, Clone)]
pub struct InMemoryActorRegistry {
    records: Arc<RwLock<HashMap<String, ActorRecord>>>,
    lookups: Arc<AtomicUsize>,
}

impl InMemoryActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subject
    pub async fn add(&self, subject_id: impl Into<String>, record: ActorRecord) {
        self.records.write().await.insert(subject_id.into(), record);
    }

    /// Number of lookups performed so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActorRegistry for InMemoryActorRegistry {
    async fn lookup(&self, subject_id: &str) -> Result<ActorRecord> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.records
            .read()
            .await
            .get(subject_id)
            .cloned()
            .ok_or_else(|| PulseError::registry(format!("client {subject_id} not found")))
    }
}

// ============================================================================
// FixedClock - Frozen clock
// ============================================================================

/// Clock that always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
