//! Error types for the dashboard engine

use std::fmt;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug)]
pub enum DashboardError {
    /// Transport failure before a response was received
    Network(reqwest::Error),

    /// Non-2xx response with a rendered detail message
    Http { status: u16, message: String },

    /// 401 or invalid/expired token; fatal to the session
    Auth(String),

    /// Client-side required-field check failed before any remote call
    Validation(String),

    /// A 2xx body failed to decode
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// Another mutation is already in flight
    Busy,

    /// Token store I/O failed
    Store(std::io::Error),
}

impl DashboardError {
    /// True for the only error class that tears down the session.
    pub fn is_session_loss(&self) -> bool {
        matches!(self, DashboardError::Auth(_))
    }
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::Network(err) => write!(f, "Network error: {}", err),
            DashboardError::Http { status, message } => {
                write!(f, "HTTP {}: {}", status, message)
            }
            DashboardError::Auth(msg) => write!(f, "Session expired: {}", msg),
            DashboardError::Validation(msg) => write!(f, "Validation error: {}", msg),
            DashboardError::Json(err) => write!(f, "JSON error: {}", err),
            DashboardError::Config(msg) => write!(f, "Configuration error: {}", msg),
            DashboardError::Busy => {
                write!(f, "Another action is still running, please wait")
            }
            DashboardError::Store(err) => write!(f, "Token store error: {}", err),
        }
    }
}

impl std::error::Error for DashboardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DashboardError::Network(err) => Some(err),
            DashboardError::Json(err) => Some(err),
            DashboardError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::Network(err)
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Json(err)
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        DashboardError::Store(err)
    }
}
