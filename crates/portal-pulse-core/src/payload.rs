// Webhook payload decoding
//
// The webhook envelope carries an untyped `data` object. Each event kind
// gets a small typed decoder that reads only the fields its rule needs.
// Missing fields and fields with a non-string JSON type decode to `None`
// instead of failing the whole payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::{PulseError, Result};

/// Webhook envelope as delivered by the portal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Event type (e.g., "client.created").
    pub event_type: String,
    /// Producer-side creation timestamp. Not used for `occurred_at`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub created: Option<String>,
    /// Producer-side object name (e.g., "event").
    #[serde(default, deserialize_with = "lenient_string")]
    pub object: Option<String>,
    /// Event data. Structure depends on event_type.
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub data: Map<String, Value>,
}

impl WebhookPayload {
    /// Decode a raw request body
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| PulseError::malformed(e.to_string()))
    }

    /// Decode `data` into a per-kind field set
    pub fn fields<T>(&self) -> T
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        // Lenient field decoders cannot fail on a JSON object, so the
        // default only covers shapes serde itself rejects.
        T::deserialize(Value::Object(self.data.clone())).unwrap_or_default()
    }
}

/// Accept only JSON strings; anything else is treated as absent
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            tracing::warn!(value = %other, "Ignoring non-string payload field");
            None
        }
        None => None,
    })
}

/// `client.created`, `client.deleted`, `client.activated`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientEventData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub invite_url: Option<String>,
}

/// `form_response.completed`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FormResponseData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub client_id: Option<String>,
}

/// `file.created`, `link.created`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedByData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_by: Option<String>,
}

/// `message.sent`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageSentData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub sender_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(data: Value) -> WebhookPayload {
        serde_json::from_value(json!({ "eventType": "client.created", "data": data })).unwrap()
    }

    #[test]
    fn test_decodes_full_envelope() {
        let body = br#"{"eventType":"message.sent","created":"2026-10-16T10:00:00Z","object":"event","data":{"senderId":"u7"}}"#;
        let payload = WebhookPayload::from_slice(body).unwrap();

        assert_eq!(payload.event_type, "message.sent");
        assert_eq!(payload.object.as_deref(), Some("event"));
        assert_eq!(
            payload.fields::<MessageSentData>().sender_id.as_deref(),
            Some("u7")
        );
    }

    #[test]
    fn test_missing_data_defaults_to_empty_object() {
        let payload = WebhookPayload::from_slice(br#"{"eventType":"client.deleted"}"#).unwrap();
        assert!(payload.data.is_empty());
        assert_eq!(payload.fields::<ClientEventData>(), ClientEventData::default());
    }

    #[test]
    fn test_unparseable_body_is_malformed() {
        let err = WebhookPayload::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, PulseError::MalformedPayload(_)));

        let err = WebhookPayload::from_slice(br#"{"data":{}}"#).unwrap_err();
        assert!(matches!(err, PulseError::MalformedPayload(_)));
    }

    #[test]
    fn test_non_string_fields_decode_as_absent() {
        let fields = payload(json!({ "id": 42, "inviteUrl": ["x"] })).fields::<ClientEventData>();
        assert_eq!(fields.id, None);
        assert_eq!(fields.invite_url, None);
    }

    #[test]
    fn test_null_and_unknown_fields_are_tolerated() {
        let fields = payload(json!({ "id": null, "extra": { "nested": true } }))
            .fields::<ClientEventData>();
        assert_eq!(fields.id, None);
    }
}
