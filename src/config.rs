use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Backend configuration
    pub api_base_url: String,
    pub auth_scheme: String,
    pub http_timeout_secs: u64,
    pub environment: String,
    pub log_level: String,

    // Local storage
    pub storage_path: PathBuf,

    // Spotlight search
    pub search_debounce_ms: u64,
    pub search_min_length: usize,

    // Notifications
    pub notification_poll_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            auth_scheme: "Token".to_string(),
            http_timeout_secs: 30,
            environment: "development".to_string(),
            log_level: "sisfom_portal=debug".to_string(),
            storage_path: PathBuf::from(".sisfom/storage.json"),
            search_debounce_ms: 300,
            search_min_length: 2,
            notification_poll_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        Ok(Config {
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            auth_scheme: env::var("AUTH_SCHEME").unwrap_or(defaults.auth_scheme),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),

            storage_path: env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),

            search_debounce_ms: env::var("SEARCH_DEBOUNCE_MS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
            search_min_length: env::var("SEARCH_MIN_LENGTH")
                .unwrap_or_else(|_| "2".to_string())
                .parse()?,

            notification_poll_secs: env::var("NOTIFICATION_POLL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn notification_poll_interval(&self) -> Duration {
        Duration::from_secs(self.notification_poll_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
