//! Ticketing services configuration
//!
//! Configuration is read from an optional TOML file (path in `TB_CONFIG`) and then
//! overridden field by field from `TB_*` environment variables. Every service
//! binary loads the same [`AppConfig`] and only reads the sections it needs.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which document store backs the repositories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Mongo,
    Memory,
}

/// Partial-failure policy of the booking workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompensationMode {
    /// Leave side effects in place and report a partially committed booking
    #[default]
    Report,
    /// Retract the booking and void the payment when a later step fails
    Compensate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port override; each binary falls back to its own default when unset
    pub port: Option<u16>,
    /// Optional Prometheus exporter port
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub url: String,
    /// Database override; each binary falls back to its own database name when unset
    pub database: Option<String>,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub mongo: MongoConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Mongo,
            mongo: MongoConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HMAC secret shared by all services
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub event_service_url: String,
    pub attendee_service_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub retry: RetrySettings,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            event_service_url: "http://localhost:5001".to_string(),
            attendee_service_url: "http://localhost:5002".to_string(),
            connect_timeout_ms: 2_000,
            request_timeout_ms: 5_000,
            retry: RetrySettings::default(),
        }
    }
}

impl RemoteSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSettings {
    pub compensation: CompensationMode,
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub auth: AuthSettings,
    pub remote: RemoteSettings,
    pub booking: BookingSettings,
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `TB_CONFIG` (if set) and the process environment, then validate
    pub fn load() -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let mut config = match env.get("TB_CONFIG") {
            Some(path) => {
                debug!("Loading configuration from {}", path);
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TB_*` overrides from the given variable map
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        if let Some(v) = env.get("TB_PORT") {
            self.server.port = Some(parse_var("TB_PORT", v)?);
        }
        if let Some(v) = env.get("TB_METRICS_PORT") {
            self.server.metrics_port = Some(parse_var("TB_METRICS_PORT", v)?);
        }
        if let Some(v) = env.get("TB_STORE") {
            self.store.kind = match v.to_lowercase().as_str() {
                "mongo" => StoreKind::Mongo,
                "memory" => StoreKind::Memory,
                _ => return Err(invalid("TB_STORE", v)),
            };
        }
        if let Some(v) = env.get("TB_MONGO_URL") {
            self.store.mongo.url = v.clone();
        }
        if let Some(v) = env.get("TB_MONGO_DB") {
            self.store.mongo.database = Some(v.clone());
        }
        if let Some(v) = env.get("TB_JWT_SECRET") {
            self.auth.jwt_secret = v.clone();
        }
        if let Some(v) = env.get("TB_TOKEN_TTL_SECS") {
            self.auth.token_ttl_secs = parse_var("TB_TOKEN_TTL_SECS", v)?;
        }
        if let Some(v) = env.get("TB_EVENT_SERVICE_URL") {
            self.remote.event_service_url = v.clone();
        }
        if let Some(v) = env.get("TB_ATTENDEE_SERVICE_URL") {
            self.remote.attendee_service_url = v.clone();
        }
        if let Some(v) = env.get("TB_CONNECT_TIMEOUT_MS") {
            self.remote.connect_timeout_ms = parse_var("TB_CONNECT_TIMEOUT_MS", v)?;
        }
        if let Some(v) = env.get("TB_REQUEST_TIMEOUT_MS") {
            self.remote.request_timeout_ms = parse_var("TB_REQUEST_TIMEOUT_MS", v)?;
        }
        if let Some(v) = env.get("TB_RETRY_MAX") {
            self.remote.retry.max_retries = parse_var("TB_RETRY_MAX", v)?;
        }
        if let Some(v) = env.get("TB_RETRY_INITIAL_MS") {
            self.remote.retry.initial_delay_ms = parse_var("TB_RETRY_INITIAL_MS", v)?;
        }
        if let Some(v) = env.get("TB_RETRY_MAX_DELAY_MS") {
            self.remote.retry.max_delay_ms = parse_var("TB_RETRY_MAX_DELAY_MS", v)?;
        }
        if let Some(v) = env.get("TB_COMPENSATION") {
            self.booking.compensation = match v.to_lowercase().as_str() {
                "report" => CompensationMode::Report,
                "compensate" => CompensationMode::Compensate,
                _ => return Err(invalid("TB_COMPENSATION", v)),
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret (TB_JWT_SECRET) must be set".to_string(),
            ));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_secs must be positive".to_string()));
        }
        for (key, url) in [
            ("remote.event_service_url", &self.remote.event_service_url),
            ("remote.attendee_service_url", &self.remote.attendee_service_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(key, url));
            }
        }
        if self.remote.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid("remote.retry.multiplier must be >= 1.0".to_string()));
        }
        Ok(())
    }

    /// Port for a service, falling back to the service's default
    pub fn port_or(&self, default: u16) -> u16 {
        self.server.port.unwrap_or(default)
    }

    /// Database name for a service, falling back to the service's default
    pub fn database_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.store.mongo.database.as_deref().unwrap_or(default)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
