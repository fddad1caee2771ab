//! Configuration management for the dashboard engine

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default sparkline series rendered when no log has a measured latency yet.
pub const DEFAULT_CHART_SERIES: [u16; 12] = [62, 54, 58, 72, 64, 78, 88, 74, 69, 80, 92, 86];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the monitoring backend
    pub base_url: String,

    /// Rows per page in the log view
    pub page_size: usize,

    /// Interval between periodic sync cycles
    pub refresh_interval: Duration,

    /// Page bound for the project list fetch
    pub project_page_limit: usize,

    /// Page bound for the service list fetch
    pub service_page_limit: usize,

    /// Recent-log page bound per service
    pub log_page_limit: usize,

    /// HTTP timeout for backend requests
    pub http_timeout: Duration,

    /// Path of the persisted session token
    pub token_path: String,

    /// Sparkline series used when no latency samples exist
    pub fallback_chart: Vec<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            page_size: 8,
            refresh_interval: Duration::from_secs(60),
            project_page_limit: 20,
            service_page_limit: 50,
            log_page_limit: 20,
            http_timeout: Duration::from_secs(10),
            token_path: ".apipulse_token".to_string(),
            fallback_chart: DEFAULT_CHART_SERIES.to_vec(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(base_url) = env::var("APIPULSE_BASE_URL") {
            config.base_url = base_url;
        }

        if let Ok(page_size) = env::var("APIPULSE_PAGE_SIZE") {
            if let Ok(size) = page_size.parse() {
                config.page_size = size;
            }
        }

        if let Ok(refresh) = env::var("APIPULSE_REFRESH_SECONDS") {
            if let Ok(seconds) = refresh.parse::<u64>() {
                config.refresh_interval = Duration::from_secs(seconds);
            }
        }

        if let Ok(limit) = env::var("APIPULSE_PROJECT_PAGE_LIMIT") {
            if let Ok(size) = limit.parse() {
                config.project_page_limit = size;
            }
        }

        if let Ok(limit) = env::var("APIPULSE_SERVICE_PAGE_LIMIT") {
            if let Ok(size) = limit.parse() {
                config.service_page_limit = size;
            }
        }

        if let Ok(limit) = env::var("APIPULSE_LOG_PAGE_LIMIT") {
            if let Ok(size) = limit.parse() {
                config.log_page_limit = size;
            }
        }

        if let Ok(timeout) = env::var("APIPULSE_HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.http_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(path) = env::var("APIPULSE_TOKEN_FILE") {
            config.token_path = path;
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url cannot be empty".to_string());
        }

        if self.page_size == 0 {
            return Err("page_size must be greater than 0".to_string());
        }

        // The backend caps list page limits at 100
        for (name, limit) in [
            ("project_page_limit", self.project_page_limit),
            ("service_page_limit", self.service_page_limit),
            ("log_page_limit", self.log_page_limit),
        ] {
            if limit == 0 || limit > 100 {
                return Err(format!("{} must be in 1..=100", name));
            }
        }

        if self.refresh_interval.is_zero() {
            return Err("refresh_interval must be greater than 0".to_string());
        }

        if self.fallback_chart.is_empty() {
            return Err("fallback_chart cannot be empty".to_string());
        }

        Ok(())
    }
}
