//! Runtime configuration for the upload worker.
//!
//! Values come from `RETROPHOTO_*` environment variables. Everything except
//! the upload API base URL has a default so the queue can be inspected without
//! network configuration.

use std::time::Duration;

use thiserror::Error;

use crate::util::{http_base_url, non_blank};

pub const ENV_API_BASE_URL: &str = "RETROPHOTO_API_BASE_URL";
pub const ENV_APP_ORIGIN: &str = "RETROPHOTO_APP_ORIGIN";
pub const ENV_MAX_ATTEMPTS: &str = "RETROPHOTO_MAX_ATTEMPTS";
pub const ENV_MAX_AGE_HOURS: &str = "RETROPHOTO_MAX_AGE_HOURS";
pub const ENV_UPLOAD_TIMEOUT_SECS: &str = "RETROPHOTO_UPLOAD_TIMEOUT_SECS";

const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_MAX_AGE_HOURS: u64 = 7 * 24;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAGE_SIZE: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Durable queue policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Failed attempts after which an item is expired
    pub max_attempts: u32,
    /// Age after which an undelivered item is expired on open
    pub max_age: Duration,
    /// Rows fetched per page by the pending cursor
    pub page_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_age: Duration::from_secs(DEFAULT_MAX_AGE_HOURS * 60 * 60),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl QueueConfig {
    /// Set the retry ceiling
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the page size of the pending cursor
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Maximum age in milliseconds, saturating
    pub fn max_age_millis(&self) -> i64 {
        i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Presentation settings for system notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Origin relative notification targets are resolved against
    pub app_origin: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            app_origin: DEFAULT_APP_ORIGIN.to_string(),
            icon: "/icons/icon-192x192.png".to_string(),
            badge: "/icons/badge-72x72.png".to_string(),
            vibrate: vec![100, 50, 100],
        }
    }
}

/// Full worker configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Base URL of the upload API; `None` when only local queue access is needed
    pub api_base_url: Option<String>,
    pub upload_timeout: Duration,
    pub queue: QueueConfig,
    pub notifications: NotificationConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            upload_timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
            queue: QueueConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| non_blank(lookup(key).as_deref());
        let mut config = Self::default();

        if let Some(url) = get(ENV_API_BASE_URL) {
            config.api_base_url = Some(normalize_http_url(&url, ENV_API_BASE_URL)?);
        }
        if let Some(origin) = get(ENV_APP_ORIGIN) {
            config.notifications.app_origin = normalize_http_url(&origin, ENV_APP_ORIGIN)?;
        }
        if let Some(raw) = get(ENV_MAX_ATTEMPTS) {
            config.queue.max_attempts = parse_positive::<u32>(&raw, ENV_MAX_ATTEMPTS)?;
        }
        if let Some(raw) = get(ENV_MAX_AGE_HOURS) {
            let hours = parse_positive::<u64>(&raw, ENV_MAX_AGE_HOURS)?;
            config.queue.max_age = Duration::from_secs(hours.saturating_mul(60 * 60));
        }
        if let Some(raw) = get(ENV_UPLOAD_TIMEOUT_SECS) {
            let secs = parse_positive::<u64>(&raw, ENV_UPLOAD_TIMEOUT_SECS)?;
            config.upload_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Upload API base URL, required for network delivery.
    pub fn require_api_base_url(&self) -> Result<&str, ConfigError> {
        self.api_base_url
            .as_deref()
            .ok_or(ConfigError::MissingVar(ENV_API_BASE_URL))
    }
}

fn normalize_http_url(raw: &str, field: &str) -> Result<String, ConfigError> {
    http_base_url(raw).ok_or_else(|| {
        ConfigError::Invalid(format!("{field} must be an absolute http:// or https:// URL"))
    })
}

/// Zero would expire or time out every queued photo, so it is rejected.
fn parse_positive<T>(raw: &str, field: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    let value: T = raw
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{field} must be a number, got '{raw}'")))?;
    if value == T::default() {
        return Err(ConfigError::Invalid(format!("{field} must be at least 1")));
    }
    Ok(value)
}
