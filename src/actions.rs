//! User-triggered mutations, serialized against the sync cycle

use crate::client::RemoteClient;
use crate::errors::{DashboardError, Result};
use crate::models::{NewProject, NewService, Project, Service, ServiceUpdate};
use crate::session::SessionManager;
use crate::sync::SyncOrchestrator;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::info;

/// Serializes create/toggle/delete mutations: one mutation in flight at a
/// time, each successful one followed by a sync refresh.
pub struct ActionCoordinator {
    client: Arc<RemoteClient>,
    session: Arc<SessionManager>,
    sync: Arc<SyncOrchestrator>,
    busy: AtomicBool,
    last_message: RwLock<Option<String>>,
}

/// Releases the busy flag when the mutation settles.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ActionCoordinator {
    pub fn new(
        client: Arc<RemoteClient>,
        session: Arc<SessionManager>,
        sync: Arc<SyncOrchestrator>,
    ) -> Self {
        Self {
            client,
            session,
            sync,
            busy: AtomicBool::new(false),
            last_message: RwLock::new(None),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Outcome message of the most recent mutation attempt, success or
    /// failure. Independent of the sync error flag.
    pub async fn last_message(&self) -> Option<String> {
        self.last_message.read().await.clone()
    }

    pub async fn take_message(&self) -> Option<String> {
        self.last_message.write().await.take()
    }

    async fn acquire(&self) -> Result<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return self.fail(DashboardError::Busy).await;
        }
        Ok(BusyGuard(&self.busy))
    }

    async fn note(&self, message: String) {
        info!("{}", message);
        *self.last_message.write().await = Some(message);
    }

    async fn fail<T>(&self, err: DashboardError) -> Result<T> {
        *self.last_message.write().await = Some(err.to_string());
        Err(err)
    }

    /// Create a project and make it the active one.
    pub async fn create_project(&self, name: &str) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return self
                .fail(DashboardError::Validation(
                    "project name is required".to_string(),
                ))
                .await;
        }

        let Some(user) = self.session.current_user().await else {
            return self
                .fail(DashboardError::Validation(
                    "sign in before creating a project".to_string(),
                ))
                .await;
        };

        let _busy = self.acquire().await?;

        let project = match self
            .client
            .create_project(
                user.id,
                &NewProject {
                    name: name.to_string(),
                },
            )
            .await
        {
            Ok(project) => project,
            Err(e) => return self.fail(e).await,
        };

        self.note(format!("Project \"{}\" created", project.name))
            .await;
        self.sync.select_project(project.id).await?;
        Ok(project)
    }

    /// Register a service under the active project.
    pub async fn create_service(&self, name: &str, url: &str, method: &str) -> Result<Service> {
        let Some(project) = self.sync.snapshot().await.active_project.clone() else {
            return self
                .fail(DashboardError::Validation(
                    "create a project before adding services".to_string(),
                ))
                .await;
        };

        let name = name.trim();
        let url = url.trim();
        if name.is_empty() {
            return self
                .fail(DashboardError::Validation(
                    "service name is required".to_string(),
                ))
                .await;
        }
        if url.is_empty() {
            return self
                .fail(DashboardError::Validation(
                    "service URL is required".to_string(),
                ))
                .await;
        }

        let method = method.trim();
        let method = if method.is_empty() {
            "GET".to_string()
        } else {
            method.to_uppercase()
        };

        let _busy = self.acquire().await?;

        let service = match self
            .client
            .create_service(
                project.id,
                &NewService {
                    name: name.to_string(),
                    url: url.to_string(),
                    method,
                },
            )
            .await
        {
            Ok(service) => service,
            Err(e) => return self.fail(e).await,
        };

        self.note(format!("Service \"{}\" created", service.name))
            .await;
        self.sync.refresh().await?;
        Ok(service)
    }

    /// Flip a service's active flag via a partial update.
    pub async fn toggle_service(&self, service: &Service) -> Result<Service> {
        let _busy = self.acquire().await?;

        let updated = match self
            .client
            .update_service(
                service.project_id,
                service.id,
                &ServiceUpdate::active(!service.is_active),
            )
            .await
        {
            Ok(updated) => updated,
            Err(e) => return self.fail(e).await,
        };

        let state = if updated.is_active {
            "resumed"
        } else {
            "paused"
        };
        self.note(format!("Service \"{}\" {}", updated.name, state))
            .await;
        self.sync.refresh().await?;
        Ok(updated)
    }

    /// Remove a service entirely.
    pub async fn delete_service(&self, service: &Service) -> Result<()> {
        let _busy = self.acquire().await?;

        if let Err(e) = self
            .client
            .delete_service(service.project_id, service.id)
            .await
        {
            return self.fail(e).await;
        }

        self.note(format!("Service \"{}\" deleted", service.name))
            .await;
        self.sync.refresh().await?;
        Ok(())
    }
}
