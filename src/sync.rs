//! Periodic fetch-merge-derive cycle and snapshot publication

use crate::client::RemoteClient;
use crate::config::Config;
use crate::derive::{self, Alert, ServiceView, StatCards};
use crate::errors::{DashboardError, Result};
use crate::models::{LogEntry, LogQuery, Project, Service, TaggedLog};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Instant, interval};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Informational message published with an empty snapshot when the
/// account has no projects yet. Not an error.
pub const NO_PROJECT_NOTICE: &str = "No projects yet. Create one to start monitoring.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    LoadingInitial,
    Ready,
    Refreshing,
}

/// The complete, internally consistent set of derived views published
/// after one sync cycle. Replaced wholesale, never mutated field by field.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub cycle_id: Uuid,
    pub projects: Vec<Project>,
    pub active_project: Option<Project>,
    pub services: Vec<Service>,
    pub views: Vec<ServiceView>,
    pub logs: Vec<TaggedLog>,
    pub alerts: Vec<Alert>,
    pub stats: StatCards,
    pub chart: Vec<u16>,
    pub synced_at: Option<DateTime<Utc>>,
    pub notice: Option<String>,
}

impl Snapshot {
    /// Placeholder before the first cycle has published anything.
    pub fn empty() -> Self {
        Self {
            cycle_id: Uuid::nil(),
            projects: Vec::new(),
            active_project: None,
            services: Vec::new(),
            views: Vec::new(),
            logs: Vec::new(),
            alerts: Vec::new(),
            stats: StatCards::empty(),
            chart: Vec::new(),
            synced_at: None,
            notice: None,
        }
    }
}

/// Coordinates the fetch-merge-derive cycle across projects, services and
/// per-service logs, and publishes one consistent snapshot per cycle.
pub struct SyncOrchestrator {
    client: Arc<RemoteClient>,
    config: Config,
    snapshot: RwLock<Arc<Snapshot>>,
    phase: RwLock<SyncPhase>,
    last_error: RwLock<Option<String>>,
    preferred_project: RwLock<Option<i64>>,
    cycle_lock: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(client: Arc<RemoteClient>, config: Config) -> Self {
        Self {
            client,
            config,
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
            phase: RwLock::new(SyncPhase::Idle),
            last_error: RwLock::new(None),
            preferred_project: RwLock::new(None),
            cycle_lock: Mutex::new(()),
        }
    }

    /// The last published snapshot. Always complete and self-consistent.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    pub async fn phase(&self) -> SyncPhase {
        *self.phase.read().await
    }

    /// Message of the last failed cycle, cleared by the next success.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Record a project preference and refresh immediately.
    pub async fn select_project(&self, project_id: i64) -> Result<()> {
        *self.preferred_project.write().await = Some(project_id);
        self.refresh().await
    }

    /// Run one sync cycle.
    ///
    /// Single-flight: a trigger arriving while a cycle is in flight is a
    /// no-op. A failed cycle keeps the previous snapshot, records the
    /// error message and settles back into `Ready`; only session loss is
    /// returned as an error.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            debug!("Sync cycle already in flight, coalescing trigger");
            return Ok(());
        };

        {
            let mut phase = self.phase.write().await;
            *phase = match *phase {
                SyncPhase::Idle => SyncPhase::LoadingInitial,
                _ => SyncPhase::Refreshing,
            };
        }

        let cycle_id = Uuid::new_v4();
        let started = Instant::now();

        match self.run_cycle(cycle_id).await {
            Ok(()) => {
                *self.last_error.write().await = None;
                *self.phase.write().await = SyncPhase::Ready;
                debug!(
                    "Sync cycle {} completed in {}ms",
                    cycle_id,
                    started.elapsed().as_millis()
                );
                Ok(())
            }
            Err(e) if e.is_session_loss() => {
                error!("Sync cycle {} lost the session: {}", cycle_id, e);
                Err(e)
            }
            Err(e) => {
                warn!(
                    "Sync cycle {} failed, keeping previous snapshot: {}",
                    cycle_id, e
                );
                *self.last_error.write().await = Some(e.to_string());
                *self.phase.write().await = SyncPhase::Ready;
                Ok(())
            }
        }
    }

    async fn run_cycle(&self, cycle_id: Uuid) -> Result<()> {
        let projects = self
            .client
            .list_projects(0, self.config.project_page_limit)
            .await?;

        if projects.is_empty() {
            self.publish(
                cycle_id,
                projects,
                None,
                Vec::new(),
                Some(NO_PROJECT_NOTICE.to_string()),
            )
            .await;
            return Ok(());
        }

        // Keep the previously active project while it still exists,
        // otherwise fall back to the first project returned.
        let preferred = *self.preferred_project.read().await;
        let active = preferred
            .and_then(|id| projects.iter().find(|project| project.id == id))
            .unwrap_or(&projects[0])
            .clone();
        *self.preferred_project.write().await = Some(active.id);

        let services = self
            .client
            .list_services(active.id, 0, self.config.service_page_limit)
            .await?;

        // Fan out one log fetch per service and join them all; any single
        // failure aborts the cycle before anything is derived or published.
        let fetches = services.iter().map(|service| {
            let client = Arc::clone(&self.client);
            let query = LogQuery::recent(self.config.log_page_limit);
            let project_id = active.id;
            let service = service.clone();
            async move {
                let mut logs = client.list_logs(project_id, service.id, &query).await?;
                logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok::<(Service, Vec<LogEntry>), DashboardError>((service, logs))
            }
        });
        let per_service = try_join_all(fetches).await?;

        self.publish(cycle_id, projects, Some(active), per_service, None)
            .await;
        Ok(())
    }

    /// Derive all views and replace the published snapshot atomically.
    async fn publish(
        &self,
        cycle_id: Uuid,
        projects: Vec<Project>,
        active_project: Option<Project>,
        per_service: Vec<(Service, Vec<LogEntry>)>,
        notice: Option<String>,
    ) {
        // One wall-clock capture per cycle; every derivation sees the
        // same instant.
        let now = Utc::now();

        let views: Vec<ServiceView> = per_service
            .iter()
            .map(|(service, logs)| derive::service_view(service, logs))
            .collect();
        let services: Vec<Service> = per_service
            .iter()
            .map(|(service, _)| service.clone())
            .collect();
        let logs = derive::merge_logs(
            per_service
                .into_iter()
                .map(|(service, logs)| (service.name, logs))
                .collect(),
        );
        let alerts = derive::alerts(&views);
        let stats = derive::aggregate_stats(&logs, &views, now);
        let chart = derive::chart_bars(&logs, &self.config.fallback_chart);

        info!(
            "Publishing snapshot {}: {} projects, {} services, {} logs, {} alerts",
            cycle_id,
            projects.len(),
            services.len(),
            logs.len(),
            alerts.len()
        );

        let snapshot = Snapshot {
            cycle_id,
            projects,
            active_project,
            services,
            views,
            logs,
            alerts,
            stats,
            chart,
            synced_at: Some(now),
            notice,
        };

        *self.snapshot.write().await = Arc::new(snapshot);
    }

    /// Reset all dashboard state. Used on session teardown.
    pub async fn clear(&self) {
        *self.snapshot.write().await = Arc::new(Snapshot::empty());
        *self.phase.write().await = SyncPhase::Idle;
        *self.last_error.write().await = None;
        *self.preferred_project.write().await = None;
        debug!("Cleared dashboard state");
    }

    /// Drive the periodic refresh until the session is lost or the future
    /// is dropped. The first tick fires immediately, covering the initial
    /// load.
    pub async fn run_periodic(&self) -> Result<()> {
        let mut ticker = interval(self.config.refresh_interval);

        loop {
            ticker.tick().await;
            self.refresh().await?;
        }
    }
}
