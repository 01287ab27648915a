// Actor registry client
//
// Resolves a subject id against the portal's client directory:
//   GET {host}/clients/{subject_id}   (X-API-KEY header)
//
// Only a 200 with a JSON object body counts as a successful lookup.
// Transport failures and 5xx responses are retried per RegistryConfig;
// every other status is final.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{PulseError, Result};
use crate::traits::ActorRegistry;

/// Header carrying the registry API key
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Client record returned by the registry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorRecord {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    /// Full response body
    pub raw: Map<String, Value>,
}

impl ActorRecord {
    pub fn from_json(raw: Map<String, Value>) -> Self {
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            given_name: text("givenName"),
            family_name: text("familyName"),
            raw,
        }
    }

    pub fn with_name(given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        let mut raw = Map::new();
        let given_name = given_name.into();
        let family_name = family_name.into();
        raw.insert("givenName".into(), Value::String(given_name.clone()));
        raw.insert("familyName".into(), Value::String(family_name.clone()));
        Self {
            given_name: Some(given_name),
            family_name: Some(family_name),
            raw,
        }
    }

    /// "Given Family", or None when either part is missing or empty
    pub fn display_name(&self) -> Option<String> {
        match (self.given_name.as_deref(), self.family_name.as_deref()) {
            (Some(given), Some(family)) if !given.is_empty() && !family.is_empty() => {
                Some(format!("{given} {family}"))
            }
            _ => None,
        }
    }
}

/// Registry connection and failure policy
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL of the directory service (e.g., https://portal.example.com/v1)
    pub host: String,
    pub api_key: String,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Extra attempts after the first one, for transport errors and 5xx only
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry
    pub retry_backoff: Duration,
}

impl RegistryConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(5),
            max_retries: 0,
            retry_backoff: Duration::from_millis(200),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Outcome of a single attempt
enum Attempt {
    Found(ActorRecord),
    Retryable(String),
    Final(String),
}

/// HTTP implementation of [`ActorRegistry`]
#[derive(Clone)]
pub struct HttpActorRegistry {
    config: RegistryConfig,
    client: Client,
}

impl HttpActorRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        // Validate the base URL once so lookups only fail on I/O
        Url::parse(&config.host)
            .map_err(|e| PulseError::config(format!("invalid registry host {}: {e}", config.host)))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PulseError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn client_url(&self, subject_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.host)
            .map_err(|e| PulseError::config(format!("invalid registry host: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| PulseError::config("registry host cannot be a base URL"))?
            .pop_if_empty()
            .extend(["clients", subject_id]);
        Ok(url)
    }

    async fn lookup_once(&self, url: &Url) -> Attempt {
        let response = match self
            .client
            .get(url.clone())
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retryable(format!("GET error: {e}")),
        };

        let status = response.status();
        if status != StatusCode::OK {
            let msg = format!("Status error: {status}");
            return if status.is_server_error() {
                Attempt::Retryable(msg)
            } else {
                Attempt::Final(msg)
            };
        }

        match response.json::<Map<String, Value>>().await {
            Ok(body) => Attempt::Found(ActorRecord::from_json(body)),
            Err(e) => Attempt::Final(format!("Invalid registry response: {e}")),
        }
    }
}

#[async_trait]
impl ActorRegistry for HttpActorRegistry {
    async fn lookup(&self, subject_id: &str) -> Result<ActorRecord> {
        let url = self.client_url(subject_id)?;
        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                warn!(
                    subject_id = %subject_id,
                    attempt = attempt,
                    max_retries = self.config.max_retries,
                    "Retrying registry lookup"
                );
                let factor = 2_u32.saturating_pow(attempt - 1);
                tokio::time::sleep(self.config.retry_backoff.saturating_mul(factor)).await;
            }

            match self.lookup_once(&url).await {
                Attempt::Found(record) => {
                    debug!(subject_id = %subject_id, attempt = attempt, "Registry lookup succeeded");
                    return Ok(record);
                }
                Attempt::Final(e) => return Err(PulseError::registry(e)),
                Attempt::Retryable(e) => last_error = e,
            }
        }

        Err(PulseError::registry(last_error))
    }
}

/// Registry used when no directory host is configured. Every lookup fails,
/// so registry-attributed events fall back and names use the placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredRegistry;

#[async_trait]
impl ActorRegistry for UnconfiguredRegistry {
    async fn lookup(&self, _subject_id: &str) -> Result<ActorRecord> {
        Err(PulseError::registry("registry host not configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry(server: &MockServer) -> HttpActorRegistry {
        HttpActorRegistry::new(
            RegistryConfig::new(server.uri(), "secret")
                .with_timeout(Duration::from_millis(500))
                .with_retry_backoff(Duration::ZERO),
        )
        .unwrap()
    }

    #[test]
    fn test_display_name_requires_both_parts() {
        assert_eq!(
            ActorRecord::with_name("Ada", "Lovelace").display_name().as_deref(),
            Some("Ada Lovelace")
        );
        assert_eq!(ActorRecord::with_name("Ada", "").display_name(), None);
        assert_eq!(ActorRecord::default().display_name(), None);

        let record = ActorRecord::from_json(
            json!({ "givenName": "Ada", "familyName": 7 })
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert_eq!(record.display_name(), None);
    }

    #[test]
    fn test_invalid_host_is_configuration_error() {
        let err = HttpActorRegistry::new(RegistryConfig::new("not a url", "k")).err().unwrap();
        assert!(matches!(err, PulseError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_lookup_sends_api_key_and_parses_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients/u1"))
            .and(header(API_KEY_HEADER, "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "givenName": "Grace",
                "familyName": "Hopper"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = registry(&server).lookup("u1").await.unwrap();
        assert_eq!(record.display_name().as_deref(), Some("Grace Hopper"));
        assert_eq!(record.raw["id"], "u1");
    }

    #[tokio::test]
    async fn test_empty_object_is_successful_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients/u9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let record = registry(&server).lookup("u9").await.unwrap();
        assert_eq!(record.display_name(), None);
    }

    #[tokio::test]
    async fn test_not_found_is_final_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let registry = HttpActorRegistry::new(
            RegistryConfig::new(server.uri(), "secret")
                .with_max_retries(3)
                .with_retry_backoff(Duration::ZERO),
        )
        .unwrap();

        let err = registry.lookup("ghost").await.unwrap_err();
        assert!(matches!(err, PulseError::RegistryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients/u2"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let registry = HttpActorRegistry::new(
            RegistryConfig::new(server.uri(), "secret")
                .with_max_retries(2)
                .with_retry_backoff(Duration::ZERO),
        )
        .unwrap();

        assert!(registry.lookup("u2").await.is_err());
    }

    #[tokio::test]
    async fn test_many_retries_do_not_overflow_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients/u5"))
            .respond_with(ResponseTemplate::new(503))
            .expect(41)
            .mount(&server)
            .await;

        let registry = HttpActorRegistry::new(
            RegistryConfig::new(server.uri(), "secret")
                .with_max_retries(40)
                .with_retry_backoff(Duration::ZERO),
        )
        .unwrap();

        let err = registry.lookup("u5").await.unwrap_err();
        assert!(matches!(err, PulseError::RegistryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_non_object_body_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients/u3"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1,2]"))
            .mount(&server)
            .await;

        assert!(registry(&server).lookup("u3").await.is_err());
    }

    #[tokio::test]
    async fn test_slow_registry_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = registry(&server).lookup("slow").await.unwrap_err();
        assert!(matches!(err, PulseError::RegistryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_host_path_prefix_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/clients/u4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let registry =
            HttpActorRegistry::new(RegistryConfig::new(format!("{}/v1/", server.uri()), "k"))
                .unwrap();
        assert!(registry.lookup("u4").await.is_ok());
    }
}
