// Event classification
//
// Maps a webhook payload to a canonical activity log entry. The rules are
// keyed by event kind:
//
//   client.created           data.id          client, admin if inviteUrl contains "/u/"
//   client.deleted           data.id          admin
//   client.activated         data.id          client
//   form_response.completed  data.clientId    client
//   file.created             data.createdBy   registry-attributed
//   link.created             data.createdBy   registry-attributed
//   message.sent             data.senderId    registry-attributed
//
// Registry-attributed kinds start as admin. When the subject id is present
// the registry is consulted, and a successful lookup makes the event a
// client event. A failed lookup applies `ClassifierConfig::lookup_failure_class`.

use std::sync::Arc;
use tracing::debug;

use crate::activity::{ActorClass, EventKind, NewActivityLogEntry};
use crate::error::Result;
use crate::payload::{
    ClientEventData, CreatedByData, FormResponseData, MessageSentData, WebhookPayload,
};
use crate::traits::{ActorRegistry, Clock};

/// Marker in an invite URL that identifies an operator-issued invitation
const ADMIN_INVITE_MARKER: &str = "/u/";

/// Failure policy for registry-attributed events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Class applied when the registry lookup fails
    pub lookup_failure_class: ActorClass,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            lookup_failure_class: ActorClass::Admin,
        }
    }
}

/// Turns webhook payloads into activity log entries
#[derive(Clone)]
pub struct EventClassifier {
    registry: Arc<dyn ActorRegistry>,
    clock: Arc<dyn Clock>,
    config: ClassifierConfig,
}

impl EventClassifier {
    pub fn new(registry: Arc<dyn ActorRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            clock,
            config: ClassifierConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Classify a payload.
    ///
    /// Returns `Err(UnrecognizedEventKind)` when no rule exists for the
    /// event type; missing fields never fail classification.
    pub async fn classify(&self, payload: &WebhookPayload) -> Result<NewActivityLogEntry> {
        let kind: EventKind = payload.event_type.parse()?;

        let (subject_id, actor_class) = match kind {
            EventKind::ClientCreated => {
                let data = payload.fields::<ClientEventData>();
                let invited = data
                    .invite_url
                    .as_deref()
                    .is_some_and(|url| url.contains(ADMIN_INVITE_MARKER));
                let actor = if invited {
                    ActorClass::Admin
                } else {
                    ActorClass::Client
                };
                (data.id.unwrap_or_default(), actor)
            }
            EventKind::ClientDeleted => (
                payload.fields::<ClientEventData>().id.unwrap_or_default(),
                ActorClass::Admin,
            ),
            EventKind::ClientActivated => (
                payload.fields::<ClientEventData>().id.unwrap_or_default(),
                ActorClass::Client,
            ),
            EventKind::FormResponseCompleted => (
                payload.fields::<FormResponseData>().client_id.unwrap_or_default(),
                ActorClass::Client,
            ),
            EventKind::FileCreated | EventKind::LinkCreated => {
                let subject = payload.fields::<CreatedByData>().created_by.unwrap_or_default();
                let actor = self.attribute(kind, &subject).await;
                (subject, actor)
            }
            EventKind::MessageSent => {
                let subject = payload.fields::<MessageSentData>().sender_id.unwrap_or_default();
                let actor = self.attribute(kind, &subject).await;
                (subject, actor)
            }
        };

        Ok(NewActivityLogEntry {
            event_kind: kind.as_str().to_string(),
            subject_id,
            actor_class,
            occurred_at: self.clock.now(),
        })
    }

    /// Registry-based attribution for file, link and message events
    async fn attribute(&self, kind: EventKind, subject_id: &str) -> ActorClass {
        if subject_id.is_empty() {
            return ActorClass::Admin;
        }

        match self.registry.lookup(subject_id).await {
            Ok(_) => ActorClass::Client,
            Err(e) => {
                let actor = self.config.lookup_failure_class;
                // Expected for operators, who are not in the client directory
                debug!(
                    event_kind = %kind,
                    subject_id = %subject_id,
                    error = %e,
                    actor_class = %actor,
                    "Registry lookup failed, applying fallback class"
                );
                actor
            }
        }
    }
}

impl std::fmt::Debug for EventClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventClassifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
