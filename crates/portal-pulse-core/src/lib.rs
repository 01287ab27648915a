// Portal activity attribution and aggregation
//
// This crate provides a DB-agnostic implementation of the activity pipeline:
// webhook payload → classified activity entry → windowed dashboard datasets.
//
// Key design decisions:
// - Uses traits (ActivityLogStore, ActorRegistry, Clock) for pluggable backends
// - Registry lookups are an injected capability with explicit timeout/retry policy
// - Payload fields are read through typed, lenient per-kind decoders
// - Every dashboard dataset is built independently; failures only drop that dataset
// - Trend days are aligned by calendar date (UTC)

pub mod activity;
pub mod aggregation;
pub mod classifier;
pub mod error;
pub mod ingest;
pub mod payload;
pub mod registry;
pub mod stats;
pub mod traits;

// In-memory implementations for dev mode and testing
pub mod memory;

// Re-exports for convenience
pub use activity::{
    ActivityLogEntry, ActivityWindow, ActorClass, DailyCount, EventKind, NewActivityLogEntry,
    SubjectActivity,
};
pub use aggregation::{AggregationEngine, FALLBACK_CLIENT_NAME};
pub use classifier::{ClassifierConfig, EventClassifier};
pub use error::{PulseError, Result};
pub use ingest::IngestService;
pub use memory::{FixedClock, InMemoryActivityLog, InMemoryActorRegistry};
pub use payload::WebhookPayload;
pub use registry::{ActorRecord, HttpActorRegistry, RegistryConfig, UnconfiguredRegistry};
pub use stats::{DashboardDataset, DataPoint, DatasetKind, StatsResponse};
pub use traits::{ActivityLogStore, ActorRegistry, Clock, SystemClock};
