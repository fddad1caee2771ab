//! Wire types for the monitoring backend REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub url: String,
    pub method: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One health-check record produced by the backend's scheduler.
/// Immutable once received.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: i64,
    pub service_id: i64,
    pub status_code: u16,
    pub response_time_ms: Option<i64>,
    pub is_success: bool,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    /// Measured latency, if any. Null and non-positive values both mean
    /// the check never produced a measurement.
    pub fn measured_latency(&self) -> Option<i64> {
        self.response_time_ms.filter(|ms| *ms > 0)
    }

    /// An entry counts as an error if the check failed or the status is 4xx/5xx.
    pub fn is_error(&self) -> bool {
        !self.is_success || self.status_code >= 400
    }
}

/// A log entry tagged with the name of the service it belongs to,
/// the element type of the merged cross-service collection.
#[derive(Clone, Debug, PartialEq)]
pub struct TaggedLog {
    pub service_name: String,
    pub entry: LogEntry,
}

#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewProject {
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewService {
    pub name: String,
    pub url: String,
    pub method: String,
}

/// Partial service update; absent fields are left untouched by the backend.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ServiceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ServiceUpdate {
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }
}

/// Optional filters for the log listing endpoint. The sync cycle only
/// pages by skip/limit; the extra filters are exposed for direct queries.
#[derive(Clone, Debug, Default)]
pub struct LogQuery {
    pub skip: usize,
    pub limit: usize,
    pub is_success: Option<bool>,
    pub status_code: Option<u16>,
    pub from_time: Option<DateTime<Utc>>,
    pub to_time: Option<DateTime<Utc>>,
}

impl LogQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}
