// Activity log domain types
//
// These types represent the persisted activity log entry and the
// query shapes the store hands back to the aggregation engine.
// Used by both API and storage crates.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::PulseError;

/// Who is deemed to have caused an event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ActorClass {
    /// End-client of the portal
    Client,
    /// Portal operator
    Admin,
}

impl ActorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorClass::Client => "client",
            ActorClass::Admin => "admin",
        }
    }
}

impl std::fmt::Display for ActorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorClass {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(ActorClass::Client),
            "admin" => Ok(ActorClass::Admin),
            other => Err(PulseError::config(format!("unknown actor class: {other}"))),
        }
    }
}

/// Webhook event types that have a classification rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ClientCreated,
    ClientDeleted,
    ClientActivated,
    FormResponseCompleted,
    FileCreated,
    LinkCreated,
    MessageSent,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::ClientCreated,
        EventKind::ClientDeleted,
        EventKind::ClientActivated,
        EventKind::FormResponseCompleted,
        EventKind::FileCreated,
        EventKind::LinkCreated,
        EventKind::MessageSent,
    ];

    /// Wire name of the event, as sent by the webhook producer
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ClientCreated => "client.created",
            EventKind::ClientDeleted => "client.deleted",
            EventKind::ClientActivated => "client.activated",
            EventKind::FormResponseCompleted => "form_response.completed",
            EventKind::FileCreated => "file.created",
            EventKind::LinkCreated => "link.created",
            EventKind::MessageSent => "message.sent",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PulseError::UnrecognizedEventKind(s.to_string()))
    }
}

/// Entry produced by the classifier, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivityLogEntry {
    pub event_kind: String,
    pub subject_id: String,
    pub actor_class: ActorClass,
    pub occurred_at: DateTime<Utc>,
}

/// Persisted activity log entry. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ActivityLogEntry {
    /// Surrogate key assigned by the store on insert.
    pub id: i64,
    pub event_kind: String,
    /// Empty when the payload did not carry a subject.
    pub subject_id: String,
    pub actor_class: ActorClass,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn from_new(id: i64, entry: NewActivityLogEntry) -> Self {
        Self {
            id,
            event_kind: entry.event_kind,
            subject_id: entry.subject_id,
            actor_class: entry.actor_class,
            occurred_at: entry.occurred_at,
        }
    }
}

/// Half-open time range `[start, end)` that scopes every read query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ActivityWindow {
    /// Default number of trailing days covered by dashboard queries
    pub const DEFAULT_DAYS: i64 = 7;

    /// Window covering the `days` preceding `now`
    pub fn trailing_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            // Entries stamped in the same instant as the query still count
            end: now + Duration::milliseconds(1),
        }
    }

    /// Window covering today and the `days - 1` calendar days before it,
    /// starting at midnight UTC
    pub fn calendar_days(now: DateTime<Utc>, days: i64) -> Self {
        let first_day = now.date_naive() - Duration::days(days.max(1) - 1);
        Self {
            start: first_day.and_time(NaiveTime::MIN).and_utc(),
            end: now + Duration::milliseconds(1),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Count of entries on one calendar day (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

/// Entry count for one subject within a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectActivity {
    pub subject_id: String,
    /// Representative kind; the lexicographically smallest kind in the group.
    pub event_kind: String,
    pub count: i64,
}
