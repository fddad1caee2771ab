//! API Pulse Dashboard Engine
//!
//! This library provides the client-side engine of a service-monitoring
//! dashboard: session handling, a periodic fetch-merge-derive sync cycle
//! against the monitoring backend, and pure derivation of health, uptime,
//! latency and alert views from raw check logs.

pub mod actions;
pub mod client;
pub mod config;
pub mod derive;
pub mod errors;
pub mod models;
pub mod session;
pub mod sync;
pub mod view;

pub use actions::ActionCoordinator;
pub use client::RemoteClient;
pub use config::Config;
pub use derive::{Alert, HealthLabel, ServiceView, StatCards};
pub use errors::{DashboardError, Result};
pub use models::{LogEntry, Project, Service, TaggedLog, User};
pub use session::{FileTokenStore, MemoryTokenStore, SessionManager, TokenStore};
pub use sync::{Snapshot, SyncOrchestrator, SyncPhase};
pub use view::{LogFilter, LogView};
