// Dashboard aggregation
//
// Builds the four dashboard datasets from windowed activity log queries.
// Each dataset is assembled on its own: if any of its queries fails the
// error is logged and that dataset is left out of the response, the rest
// are still returned. Output order is fixed:
//   signup source, signup trend, portal activity, activity per client

use chrono::{Datelike, Duration, Weekday};
use futures::future::{join_all, try_join_all};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

use crate::activity::{ActivityWindow, ActorClass, EventKind};
use crate::error::Result;
use crate::stats::{DashboardDataset, DataPoint, DatasetKind, StatsResponse};
use crate::traits::{ActivityLogStore, ActorRegistry, Clock};

pub const SIGNUP_SOURCE_TITLE: &str = "Signup source";
pub const SIGNUP_TREND_TITLE: &str = "Signups in last 7 days";
pub const PORTAL_ACTIVITY_TITLE: &str = "Portal activity";
pub const ACTIVITY_PER_CLIENT_TITLE: &str = "Activity per client";

/// Key used when a subject has no resolvable display name
pub const FALLBACK_CLIENT_NAME: &str = "Demo Client";

/// Number of points in the signup trend
const TREND_DAYS: i64 = 7;

/// Fixed (key, label, kind, actor) table of the portal activity chart
static PORTAL_ACTIVITY: [(&str, &str, EventKind, ActorClass); 9] = [
    ("clients-deleted", "Clients deleted", EventKind::ClientDeleted, ActorClass::Admin),
    ("new-clients-activated", "New clients activated", EventKind::ClientActivated, ActorClass::Client),
    ("forms-submitted", "Forms submitted", EventKind::FormResponseCompleted, ActorClass::Client),
    ("files-admin", "Files by admin", EventKind::FileCreated, ActorClass::Admin),
    ("files-clients", "Files by clients", EventKind::FileCreated, ActorClass::Client),
    ("links-admin", "Links by admin", EventKind::LinkCreated, ActorClass::Admin),
    ("links-clients", "Links by clients", EventKind::LinkCreated, ActorClass::Client),
    ("messages-admin", "Messages by admin", EventKind::MessageSent, ActorClass::Admin),
    ("messages-clients", "Messages by clients", EventKind::MessageSent, ActorClass::Client),
];

/// Composes store queries into dashboard datasets
#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn ActivityLogStore>,
    registry: Arc<dyn ActorRegistry>,
    clock: Arc<dyn Clock>,
    window_days: i64,
}

impl AggregationEngine {
    pub fn new(
        store: Arc<dyn ActivityLogStore>,
        registry: Arc<dyn ActorRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            window_days: ActivityWindow::DEFAULT_DAYS,
        }
    }

    /// Set the length of the rolling window in days
    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days.max(1);
        self
    }

    fn window(&self) -> ActivityWindow {
        ActivityWindow::trailing_days(self.clock.now(), self.window_days)
    }

    /// Build every dataset, omitting the ones that failed
    pub async fn build(&self) -> StatsResponse {
        let window = self.window();

        let (source, trend, activity, per_client) = tokio::join!(
            self.signup_source(window),
            self.signup_trend(),
            self.portal_activity(window),
            self.activity_per_client(window),
        );

        let data = [
            (SIGNUP_SOURCE_TITLE, source),
            (SIGNUP_TREND_TITLE, trend),
            (PORTAL_ACTIVITY_TITLE, activity),
            (ACTIVITY_PER_CLIENT_TITLE, per_client),
        ]
        .into_iter()
        .filter_map(|(title, result)| match result {
            Ok(dataset) => Some(dataset),
            Err(e) => {
                error!(dataset = title, error = %e, "Error while gathering data");
                None
            }
        })
        .collect();

        StatsResponse { data }
    }

    /// Direct signups vs. invited clients
    pub async fn signup_source(&self, window: ActivityWindow) -> Result<DashboardDataset> {
        let kind = EventKind::ClientCreated.as_str();
        let (direct, invited) = tokio::try_join!(
            self.store.count_by_kind_and_actor(window, kind, ActorClass::Client),
            self.store.count_by_kind_and_actor(window, kind, ActorClass::Admin),
        )?;

        Ok(DashboardDataset::new(
            DatasetKind::Pie,
            SIGNUP_SOURCE_TITLE,
            vec![
                DataPoint::new("direct-signup", "Direct", direct),
                DataPoint::new("invited", "Invited", invited),
            ],
        ))
    }

    /// Signups per day, today first, exactly seven points.
    ///
    /// Days are matched by calendar date (UTC), so a day without signups
    /// gets a zero instead of shifting later days into its slot. The query
    /// covers the seven whole days shown, whatever `window_days` is.
    pub async fn signup_trend(&self) -> Result<DashboardDataset> {
        let now = self.clock.now();
        let window = ActivityWindow::calendar_days(now, TREND_DAYS);
        let daily = self
            .store
            .count_by_kind_per_day(window, EventKind::ClientCreated.as_str())
            .await?;
        let by_day: HashMap<_, _> = daily.into_iter().map(|d| (d.day, d.count)).collect();

        let today = now.date_naive();
        let points = (0..TREND_DAYS)
            .map(|offset| {
                let day = today - Duration::days(offset);
                let name = weekday_name(day.weekday());
                DataPoint::new(name, name, by_day.get(&day).copied().unwrap_or(0))
            })
            .collect();

        Ok(DashboardDataset::new(DatasetKind::Line, SIGNUP_TREND_TITLE, points))
    }

    /// Fixed categorical counts of portal actions
    pub async fn portal_activity(&self, window: ActivityWindow) -> Result<DashboardDataset> {
        let counts = try_join_all(PORTAL_ACTIVITY.iter().map(|(_, _, kind, actor)| {
            self.store.count_by_kind_and_actor(window, kind.as_str(), *actor)
        }))
        .await?;

        let points = PORTAL_ACTIVITY
            .iter()
            .zip(counts)
            .map(|((key, label, _, _), count)| DataPoint::new(*key, *label, count))
            .collect();

        Ok(DashboardDataset::new(DatasetKind::BarSingle, PORTAL_ACTIVITY_TITLE, points))
    }

    /// Entry count per subject, keyed by the subject's display name
    pub async fn activity_per_client(&self, window: ActivityWindow) -> Result<DashboardDataset> {
        let groups = self.store.count_grouped_by_subject(window).await?;

        let names = join_all(groups.iter().map(|g| self.display_name(&g.subject_id))).await;

        let points = groups
            .into_iter()
            .zip(names)
            .map(|(group, name)| DataPoint::new(name, group.event_kind, group.count))
            .collect();

        Ok(DashboardDataset::new(DatasetKind::BarMulti, ACTIVITY_PER_CLIENT_TITLE, points))
    }

    async fn display_name(&self, subject_id: &str) -> String {
        if subject_id.is_empty() {
            return FALLBACK_CLIENT_NAME.to_string();
        }

        match self.registry.lookup(subject_id).await {
            Ok(record) => record
                .display_name()
                .unwrap_or_else(|| FALLBACK_CLIENT_NAME.to_string()),
            Err(e) => {
                debug!(subject_id = %subject_id, error = %e, "No display name for subject");
                FALLBACK_CLIENT_NAME.to_string()
            }
        }
    }
}

/// English weekday name, e.g. "Monday"
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{
        ActivityLogEntry, DailyCount, NewActivityLogEntry, SubjectActivity,
    };
    use crate::error::PulseError;
    use crate::memory::{FixedClock, InMemoryActivityLog, InMemoryActorRegistry};
    use crate::registry::ActorRecord;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    // 2026-10-16 is a Friday
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap()
    }

    struct Fixture {
        log: InMemoryActivityLog,
        registry: InMemoryActorRegistry,
        engine: AggregationEngine,
    }

    fn fixture() -> Fixture {
        let log = InMemoryActivityLog::new();
        let registry = InMemoryActorRegistry::new();
        let engine = AggregationEngine::new(
            Arc::new(log.clone()),
            Arc::new(registry.clone()),
            Arc::new(FixedClock::new(now())),
        );
        Fixture { log, registry, engine }
    }

    async fn record(log: &InMemoryActivityLog, kind: &str, subject: &str, actor: ActorClass, at: DateTime<Utc>) {
        log.insert(NewActivityLogEntry {
            event_kind: kind.to_string(),
            subject_id: subject.to_string(),
            actor_class: actor,
            occurred_at: at,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_empty_store_builds_all_datasets_in_order() {
        let f = fixture();
        let response = f.engine.build().await;

        let titles: Vec<_> = response.data.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                SIGNUP_SOURCE_TITLE,
                SIGNUP_TREND_TITLE,
                PORTAL_ACTIVITY_TITLE,
                ACTIVITY_PER_CLIENT_TITLE
            ]
        );
        assert!(response.data[0].points.iter().all(|p| p.count == 0));
        assert_eq!(response.data[2].points.len(), 9);
        assert!(response.data[3].points.is_empty());
    }

    #[tokio::test]
    async fn test_signup_source_splits_by_actor() {
        let f = fixture();
        record(&f.log, "client.created", "u1", ActorClass::Admin, now()).await;
        record(&f.log, "client.created", "u2", ActorClass::Client, now()).await;
        record(&f.log, "client.created", "u3", ActorClass::Client, now()).await;

        let dataset = f.engine.signup_source(f.engine.window()).await.unwrap();
        assert_eq!(dataset.kind, DatasetKind::Pie);
        assert_eq!(dataset.point("direct-signup").unwrap().count, 2);
        assert_eq!(dataset.point("invited").unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_trend_without_data_has_seven_zero_points() {
        let f = fixture();
        let dataset = f.engine.signup_trend().await.unwrap();

        let labels: Vec<_> = dataset.points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Friday", "Thursday", "Wednesday", "Tuesday", "Monday", "Sunday", "Saturday"]
        );
        assert!(dataset.points.iter().all(|p| p.count == 0 && p.key == p.label));
    }

    #[tokio::test]
    async fn test_trend_aligns_counts_by_date_not_position() {
        let f = fixture();
        // Two signups three days ago, none in between
        record(&f.log, "client.created", "u1", ActorClass::Client, now() - Duration::days(3)).await;
        record(&f.log, "client.created", "u2", ActorClass::Admin, now() - Duration::days(3)).await;
        record(&f.log, "client.created", "u3", ActorClass::Client, now()).await;

        let dataset = f.engine.signup_trend().await.unwrap();
        let counts: Vec<_> = dataset.points.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![1, 0, 0, 2, 0, 0, 0]);
        assert_eq!(dataset.points[3].label, "Tuesday");
    }

    #[tokio::test]
    async fn test_portal_activity_counts_deleted_clients() {
        let f = fixture();
        record(&f.log, "client.deleted", "u1", ActorClass::Admin, now()).await;
        record(&f.log, "file.created", "c1", ActorClass::Client, now()).await;
        record(&f.log, "file.created", "op", ActorClass::Admin, now() - Duration::days(10)).await;

        let dataset = f.engine.portal_activity(f.engine.window()).await.unwrap();
        let keys: Vec<_> = dataset.points.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, PORTAL_ACTIVITY.iter().map(|row| row.0).collect::<Vec<_>>());
        assert_eq!(dataset.point("clients-deleted").unwrap().count, 1);
        assert_eq!(dataset.point("files-clients").unwrap().count, 1);
        assert_eq!(dataset.point("files-admin").unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_per_client_uses_display_names_with_fallback() {
        let f = fixture();
        f.registry.add("c1", ActorRecord::with_name("Ada", "Lovelace")).await;
        f.registry.add("u9", ActorRecord::default()).await;
        f.registry.add("c3", ActorRecord::with_name("Grace", "")).await;
        record(&f.log, "message.sent", "c1", ActorClass::Client, now()).await;
        record(&f.log, "message.sent", "c1", ActorClass::Client, now()).await;
        record(&f.log, "file.created", "u9", ActorClass::Client, now()).await;
        record(&f.log, "link.created", "c3", ActorClass::Client, now()).await;
        record(&f.log, "link.created", "gone", ActorClass::Admin, now()).await;

        let dataset = f.engine.activity_per_client(f.engine.window()).await.unwrap();
        assert_eq!(dataset.kind, DatasetKind::BarMulti);

        let points: Vec<_> = dataset
            .points
            .iter()
            .map(|p| (p.key.as_str(), p.label.as_str(), p.count))
            .collect();
        assert_eq!(
            points,
            vec![
                ("Ada Lovelace", "message.sent", 2),
                ("Demo Client", "link.created", 1),
                ("Demo Client", "link.created", 1),
                ("Demo Client", "file.created", 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_subject_is_not_looked_up() {
        let f = fixture();
        record(&f.log, "file.created", "", ActorClass::Admin, now()).await;

        let dataset = f.engine.activity_per_client(f.engine.window()).await.unwrap();
        assert_eq!(dataset.points[0].key, FALLBACK_CLIENT_NAME);
        assert_eq!(f.registry.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_trend_covers_seven_days_with_shorter_window() {
        let f = fixture();
        let engine = f.engine.clone().with_window_days(3);
        record(&f.log, "client.created", "u1", ActorClass::Client, now() - Duration::days(5)).await;
        // 2026-10-10 01:00, the oldest day shown
        record(
            &f.log,
            "client.created",
            "u2",
            ActorClass::Client,
            now() - Duration::days(6) - Duration::hours(14),
        )
        .await;

        let response = engine.build().await;
        let trend = &response.data[1];
        assert_eq!(trend.title, SIGNUP_TREND_TITLE);
        let counts: Vec<_> = trend.points.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![0, 0, 0, 0, 0, 1, 1]);

        // The other datasets keep the configured window
        assert_eq!(response.data[0].point("direct-signup").unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_nameless_http_record_falls_back_to_placeholder() {
        use crate::registry::{HttpActorRegistry, RegistryConfig};
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients/u9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;
        let registry = HttpActorRegistry::new(RegistryConfig::new(server.uri(), "secret")).unwrap();

        let log = InMemoryActivityLog::new();
        record(&log, "file.created", "u9", ActorClass::Client, now()).await;
        let engine = AggregationEngine::new(
            Arc::new(log),
            Arc::new(registry),
            Arc::new(FixedClock::new(now())),
        );

        let dataset = engine.activity_per_client(engine.window()).await.unwrap();
        assert_eq!(
            dataset.points,
            vec![DataPoint::new(FALLBACK_CLIENT_NAME, "file.created", 1)]
        );
    }

    /// Store whose per-day query always fails
    struct BrokenTrendStore(InMemoryActivityLog);

    #[async_trait]
    impl ActivityLogStore for BrokenTrendStore {
        async fn insert(&self, entry: NewActivityLogEntry) -> Result<ActivityLogEntry> {
            self.0.insert(entry).await
        }

        async fn count_by_kind_and_actor(
            &self,
            window: ActivityWindow,
            event_kind: &str,
            actor_class: ActorClass,
        ) -> Result<i64> {
            self.0.count_by_kind_and_actor(window, event_kind, actor_class).await
        }

        async fn count_by_kind_per_day(
            &self,
            _window: ActivityWindow,
            _event_kind: &str,
        ) -> Result<Vec<DailyCount>> {
            Err(PulseError::storage("database is locked"))
        }

        async fn count_grouped_by_subject(
            &self,
            window: ActivityWindow,
        ) -> Result<Vec<SubjectActivity>> {
            self.0.count_grouped_by_subject(window).await
        }
    }

    #[tokio::test]
    async fn test_failed_dataset_is_omitted() {
        let engine = AggregationEngine::new(
            Arc::new(BrokenTrendStore(InMemoryActivityLog::new())),
            Arc::new(InMemoryActorRegistry::new()),
            Arc::new(FixedClock::new(now())),
        );

        let response = engine.build().await;
        let titles: Vec<_> = response.data.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![SIGNUP_SOURCE_TITLE, PORTAL_ACTIVITY_TITLE, ACTIVITY_PER_CLIENT_TITLE]
        );
    }
}
