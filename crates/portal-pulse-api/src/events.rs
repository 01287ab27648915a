// Webhook intake route
//
// The sender always gets 200 with an empty body. Undecodable payloads,
// unclassified event types and store failures are logged and dropped.

use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Router};
use portal_pulse_core::ingest::log_dropped;
use portal_pulse_core::{IngestService, WebhookPayload};
use std::sync::Arc;

/// App state for webhook routes
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
}

impl AppState {
    pub fn new(ingest: IngestService) -> Self {
        Self {
            ingest: Arc::new(ingest),
        }
    }
}

/// Create webhook routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/events", post(receive_event))
        .with_state(state)
}

/// POST /events - Receive a portal webhook
#[utoipa::path(
    post,
    path = "/events",
    request_body = WebhookPayload,
    responses(
        (status = 200, description = "Event received (recorded or dropped)")
    ),
    tag = "events"
)]
pub async fn receive_event(State(state): State<AppState>, body: Bytes) -> StatusCode {
    if let Err(e) = state.ingest.ingest_body(&body).await {
        log_dropped(&e);
    }
    StatusCode::OK
}
