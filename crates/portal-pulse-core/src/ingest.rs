// Webhook ingestion
//
// decode body -> classify -> insert. Every failure is reported to the
// caller as a PulseError so it can be logged; nothing is retried.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::activity::ActivityLogEntry;
use crate::classifier::EventClassifier;
use crate::error::{PulseError, Result};
use crate::payload::WebhookPayload;
use crate::traits::ActivityLogStore;

pub struct IngestService {
    classifier: EventClassifier,
    store: Arc<dyn ActivityLogStore>,
}

impl IngestService {
    pub fn new(classifier: EventClassifier, store: Arc<dyn ActivityLogStore>) -> Self {
        Self { classifier, store }
    }

    /// Ingest a raw webhook body
    pub async fn ingest_body(&self, body: &[u8]) -> Result<ActivityLogEntry> {
        let payload = WebhookPayload::from_slice(body)?;
        self.ingest(&payload).await
    }

    /// Classify and persist a decoded payload
    pub async fn ingest(&self, payload: &WebhookPayload) -> Result<ActivityLogEntry> {
        let entry = self.classifier.classify(payload).await?;
        let stored = self.store.insert(entry).await?;

        info!(
            id = stored.id,
            event_kind = %stored.event_kind,
            subject_id = %stored.subject_id,
            actor_class = %stored.actor_class,
            "Recorded activity"
        );
        Ok(stored)
    }
}

/// Log the reason a webhook produced no entry
pub fn log_dropped(error: &PulseError) {
    match error {
        PulseError::UnrecognizedEventKind(event_type) => {
            debug!(event_type = %event_type, "Ignoring event without classification rule")
        }
        PulseError::MalformedPayload(reason) => {
            warn!(reason = %reason, "Not able to decode webhook payload")
        }
        other => warn!(error = %other, "Dropping webhook event"),
    }
}
