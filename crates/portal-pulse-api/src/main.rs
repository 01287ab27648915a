// Portal Pulse API server
// Decision: Webhook intake and dashboard reads share one process and one activity log
// Decision: Store and registry are chosen at startup and injected into the route states

mod config;
mod events;
mod stats;

use anyhow::{Context, Result};
use axum::http::{header, Method};
use axum::{extract::State, routing::get, Json, Router};
use portal_pulse_core::{
    ActivityLogStore, ActorRegistry, AggregationEngine, ClassifierConfig, Clock,
    DashboardDataset, DataPoint, DatasetKind, EventClassifier, HttpActorRegistry,
    InMemoryActivityLog, IngestService, StatsResponse, SystemClock, UnconfiguredRegistry,
    WebhookPayload,
};
use portal_pulse_storage::{open_db_activity_log, DbActivityLog};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use crate::config::{AppConfig, StorageBackend};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    storage: &'static str,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.storage,
    })
}

/// State for health endpoint
#[derive(Clone)]
struct HealthState {
    storage: &'static str,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(events::receive_event, stats::get_stats),
    components(schemas(
        WebhookPayload,
        StatsResponse,
        DashboardDataset,
        DataPoint,
        DatasetKind,
    )),
    tags(
        (name = "events", description = "Portal webhook intake"),
        (name = "stats", description = "Dashboard datasets")
    ),
    info(
        title = "Portal Pulse API",
        version = "0.1.0",
        description = "Records portal webhook events and serves dashboard statistics",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

/// Shared collaborators of the route states
#[derive(Clone)]
struct Components {
    store: Arc<dyn ActivityLogStore>,
    registry: Arc<dyn ActorRegistry>,
    clock: Arc<dyn Clock>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal_pulse_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("portal-pulse-api starting...");

    let config = AppConfig::from_env();

    // Initialize activity log
    let (store, db): (Arc<dyn ActivityLogStore>, Option<DbActivityLog>) = match config.storage {
        StorageBackend::Sqlite => {
            let db = open_db_activity_log(&config.database_url)
                .await
                .context("Failed to open activity log database")?;
            tracing::info!(url = %config.database_url, "Connected to database");
            let store: Arc<dyn ActivityLogStore> = Arc::new(db.clone());
            (store, Some(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory activity log, entries are lost on restart");
            let store: Arc<dyn ActivityLogStore> = Arc::new(InMemoryActivityLog::new());
            (store, None)
        }
    };

    // Initialize client directory
    let registry: Arc<dyn ActorRegistry> = match config.registry.client_config() {
        Some(registry_config) => {
            tracing::info!(
                host = %registry_config.host,
                timeout_secs = registry_config.timeout.as_secs(),
                max_retries = registry_config.max_retries,
                "Client registry configured"
            );
            Arc::new(
                HttpActorRegistry::new(registry_config)
                    .context("Invalid client registry configuration")?,
            )
        }
        None => {
            tracing::warn!(
                "Client registry not configured (HOST not set). Lookups will fail and fall back."
            );
            Arc::new(UnconfiguredRegistry)
        }
    };

    let components = Components {
        store,
        registry,
        clock: Arc::new(SystemClock),
    };

    if config.cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS origins configured");
    }
    tracing::info!(path = %config.assets_path.display(), "Serving dashboard assets");

    let app = build_app(components, &config).layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(db) = db {
        db.database().close().await;
        tracing::info!("Database connections closed");
    }

    Ok(())
}

/// Build the full router: API routes, health, OpenAPI document and the
/// static dashboard fallback
fn build_app(components: Components, config: &AppConfig) -> Router {
    let classifier = EventClassifier::new(components.registry.clone(), components.clock.clone())
        .with_config(ClassifierConfig {
            lookup_failure_class: config.registry.failure_class,
        });
    let ingest = IngestService::new(classifier, components.store.clone());

    let engine = AggregationEngine::new(
        components.store,
        components.registry,
        components.clock,
    )
    .with_window_days(config.stats_window_days);

    let health_state = HealthState {
        storage: config.storage.as_str(),
    };

    let app = Router::new()
        .route("/health", get(health).with_state(health_state))
        .route(
            "/api-doc/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(events::routes(events::AppState::new(ingest)))
        .merge(stats::routes(stats::AppState::new(engine)))
        .fallback_service(ServeDir::new(&config.assets_path));

    // Add CORS layer only if origins are configured
    if config.cors_origins.is_empty() {
        app
    } else {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.cors_origins.clone()))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]),
        )
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
