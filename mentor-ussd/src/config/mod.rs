//! Runtime configuration
//!
//! Layered: built-in defaults, then `config.toml` from the user config
//! directory (or an explicit path), then `.env` and process environment.

pub mod repository;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ResilienceConfig;
use crate::ussd::AgePolicy;

pub const APP_DIR: &str = "mentor-ussd";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/";
pub const DEFAULT_RESOURCE_BASE_URL: &str = "http://localhost:8000/resources";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub api: ApiSettings,
    pub sms: SmsSettings,
    pub ussd: UssdSettings,
    pub resilience: ResilienceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Defaults to `<data dir>/mentor-ussd/mentorship.db`
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsSettings {
    pub username: String,
    /// Without a key, messages are only logged
    pub api_key: Option<String>,
    pub sender_id: Option<String>,
}

impl Default for SmsSettings {
    fn default() -> Self {
        Self {
            username: "sandbox".to_string(),
            api_key: None,
            sender_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UssdSettings {
    pub age_policy: AgePolicy,
    /// Defaults to `<data dir>/mentor-ussd/fallback`
    pub fallback_dir: Option<PathBuf>,
    pub resource_base_url: String,
}

impl Default for UssdSettings {
    fn default() -> Self {
        Self {
            age_policy: AgePolicy::default(),
            fallback_dir: None,
            resource_base_url: DEFAULT_RESOURCE_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_concurrent_requests: usize,
    pub concurrency_enabled: bool,
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            max_concurrent_requests: 16,
            concurrency_enabled: true,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Load configuration. An explicit path must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", env_file.display());
        }

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `MENTOR_USSD_*`, `MENTOR_API_*` and `AT_*` overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = get("MENTOR_USSD_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("MENTOR_USSD_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid MENTOR_USSD_PORT: {}", port))?;
        }
        if let Some(path) = get("MENTOR_USSD_DATABASE") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(url) = get("MENTOR_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(token) = get("MENTOR_API_TOKEN") {
            self.api.token = Some(token);
        }
        if let Some(username) = get("AT_USERNAME") {
            self.sms.username = username;
        }
        if let Some(key) = get("AT_API_KEY") {
            self.sms.api_key = Some(key);
        }
        if let Some(sender) = get("AT_SENDER_ID") {
            self.sms.sender_id = Some(sender);
        }
        if let Some(dir) = get("MENTOR_USSD_FALLBACK_DIR") {
            self.ussd.fallback_dir = Some(PathBuf::from(dir));
        }
        if let Some(policy) = get("MENTOR_USSD_AGE_POLICY") {
            self.ussd.age_policy = AgePolicy::parse(&policy).with_context(|| {
                format!(
                    "Invalid MENTOR_USSD_AGE_POLICY: {} (expected substitute or reject)",
                    policy
                )
            })?;
        }
        if let Some(url) = get("MENTOR_USSD_RESOURCE_BASE_URL") {
            self.ussd.resource_base_url = url;
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| data_dir().join("mentorship.db"))
    }

    pub fn fallback_dir(&self) -> PathBuf {
        self.ussd
            .fallback_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("fallback"))
    }

    pub fn resilience(&self) -> ResilienceConfig {
        let settings = &self.resilience;
        ResilienceConfig::builder()
            .request_timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .max_concurrent_requests(settings.max_concurrent_requests)
            .concurrency_enabled(settings.concurrency_enabled)
            .build()
    }
}
