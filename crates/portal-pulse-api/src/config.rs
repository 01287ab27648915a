// Service configuration loaded from environment variables.
// Decision: Registry settings keep the HOST / API_KEY names used by existing deployments
// Decision: Default to a file-backed SQLite store; "memory" is for local development

use axum::http::HeaderValue;
use portal_pulse_core::{ActivityWindow, ActorClass, RegistryConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Where activity entries are kept
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Sqlite,
    /// Process-local, lost on restart
    Memory,
}

impl StorageBackend {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => StorageBackend::Memory,
            _ => StorageBackend::Sqlite,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Memory => "memory",
        }
    }
}

/// Client directory settings
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Base URL; lookups are disabled when unset
    pub host: Option<String>,
    pub api_key: String,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Actor class recorded when a lookup fails
    pub failure_class: ActorClass,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            host: None,
            api_key: String::new(),
            timeout: Duration::from_secs(5),
            max_retries: 0,
            failure_class: ActorClass::Admin,
        }
    }
}

impl RegistrySettings {
    /// HTTP client config, or None when no host is configured
    pub fn client_config(&self) -> Option<RegistryConfig> {
        self.host.as_ref().map(|host| {
            RegistryConfig::new(host.clone(), self.api_key.clone())
                .with_timeout(self.timeout)
                .with_max_retries(self.max_retries)
        })
    }
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: String,
    pub registry: RegistrySettings,
    /// Length of the dashboard window in days
    pub stats_window_days: i64,
    /// Directory with the built dashboard UI
    pub assets_path: PathBuf,
    pub cors_origins: Vec<HeaderValue>,
}

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://activity.db?mode=rwc";
pub const LOCAL_ASSETS_PATH: &str = "./web/dist";
pub const DEPLOYED_ASSETS_PATH: &str = "/app/web/dist";
/// Upper bound for REGISTRY_MAX_RETRIES
pub const MAX_REGISTRY_RETRIES: u32 = 10;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            storage: StorageBackend::default(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            registry: RegistrySettings::default(),
            stats_window_days: ActivityWindow::DEFAULT_DAYS,
            assets_path: PathBuf::from(DEPLOYED_ASSETS_PATH),
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let storage = std::env::var("STORAGE_BACKEND")
            .map(|s| StorageBackend::from_str(&s))
            .unwrap_or_default();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.database_url);

        let registry = RegistrySettings {
            host: std::env::var("HOST").ok().filter(|s| !s.trim().is_empty()),
            api_key: std::env::var("API_KEY").unwrap_or_default(),
            timeout: std::env::var("REGISTRY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.registry.timeout),
            max_retries: std::env::var("REGISTRY_MAX_RETRIES")
                .ok()
                .and_then(|s| parse_max_retries(&s))
                .unwrap_or(defaults.registry.max_retries),
            failure_class: std::env::var("REGISTRY_FALLBACK_CLASS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.registry.failure_class),
        };

        let stats_window_days = std::env::var("STATS_WINDOW_DAYS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|days| *days > 0)
            .unwrap_or(defaults.stats_window_days);

        let is_local = std::env::var("IS_LOCAL")
            .map(|s| !s.is_empty() && s != "0" && s.to_lowercase() != "false")
            .unwrap_or(false);
        let assets_path = std::env::var("ASSETS_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_assets_path(is_local));

        let cors_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        Self {
            port,
            storage,
            database_url,
            registry,
            stats_window_days,
            assets_path,
            cors_origins,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

pub fn default_assets_path(is_local: bool) -> PathBuf {
    if is_local {
        PathBuf::from(LOCAL_ASSETS_PATH)
    } else {
        PathBuf::from(DEPLOYED_ASSETS_PATH)
    }
}

/// Retry count capped at [`MAX_REGISTRY_RETRIES`]; None when not a number
pub fn parse_max_retries(value: &str) -> Option<u32> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .map(|n| n.min(MAX_REGISTRY_RETRIES))
}

/// Comma separated origins; invalid entries are skipped
pub fn parse_origins(value: &str) -> Vec<HeaderValue> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}
