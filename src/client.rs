//! Authenticated HTTP client for the monitoring backend

use crate::errors::{DashboardError, Result};
use crate::models::{
    Credentials, HealthStatus, LogEntry, LogQuery, NewProject, NewService, Project, Service,
    ServiceUpdate, TokenResponse, User,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// REST client owning the bearer token and base URL.
///
/// The token is the only mutable state; it is set by the session layer on
/// login/restore and cleared on logout or session loss.
#[derive(Debug)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl RemoteClient {
    /// Create a new client against the given backend base URL
    pub fn new(base_url: impl Into<String>, http_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("apipulse/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DashboardError::Network)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer token (if any) and execute the request.
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let builder = match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = builder.send().await.map_err(DashboardError::Network)?;
        self.check(response).await
    }

    /// Map a non-2xx response into the error taxonomy.
    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = render_detail(status, &body);
        debug!("Backend rejected request: {} {}", status.as_u16(), message);

        if status == StatusCode::UNAUTHORIZED {
            return Err(DashboardError::Auth(message));
        }

        Err(DashboardError::Http {
            status: status.as_u16(),
            message,
        })
    }

    /// Decode a 2xx JSON body. A 204 carries no body and is only ever
    /// expected by the delete endpoints, which never call this.
    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let text = response.text().await.map_err(DashboardError::Network)?;
        serde_json::from_str(&text).map_err(DashboardError::Json)
    }

    // --- auth ---

    pub async fn register(&self, credentials: &Credentials) -> Result<User> {
        let response = self
            .send(self.client.post(self.url("/auth/register")).json(credentials))
            .await?;
        self.read_json(response).await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<String> {
        let response = self
            .send(self.client.post(self.url("/auth/login")).json(credentials))
            .await?;
        let token: TokenResponse = self.read_json(response).await?;
        Ok(token.access_token)
    }

    pub async fn me(&self) -> Result<User> {
        let response = self.send(self.client.get(self.url("/auth/me"))).await?;
        self.read_json(response).await
    }

    // --- projects ---

    pub async fn list_projects(&self, skip: usize, limit: usize) -> Result<Vec<Project>> {
        let response = self
            .send(
                self.client
                    .get(self.url("/projects/"))
                    .query(&[("skip", skip), ("limit", limit)]),
            )
            .await?;
        self.read_json(response).await
    }

    pub async fn create_project(&self, owner_id: i64, project: &NewProject) -> Result<Project> {
        let response = self
            .send(
                self.client
                    .post(self.url("/projects/"))
                    .query(&[("owner_id", owner_id)])
                    .json(project),
            )
            .await?;
        self.read_json(response).await
    }

    pub async fn delete_project(&self, project_id: i64) -> Result<()> {
        self.send(
            self.client
                .delete(self.url(&format!("/projects/{}", project_id))),
        )
        .await?;
        Ok(())
    }

    // --- services ---

    pub async fn list_services(
        &self,
        project_id: i64,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Service>> {
        let response = self
            .send(
                self.client
                    .get(self.url(&format!("/projects/{}/services/", project_id)))
                    .query(&[("skip", skip), ("limit", limit)]),
            )
            .await?;
        self.read_json(response).await
    }

    pub async fn create_service(&self, project_id: i64, service: &NewService) -> Result<Service> {
        let response = self
            .send(
                self.client
                    .post(self.url(&format!("/projects/{}/services/", project_id)))
                    .json(service),
            )
            .await?;
        self.read_json(response).await
    }

    pub async fn update_service(
        &self,
        project_id: i64,
        service_id: i64,
        patch: &ServiceUpdate,
    ) -> Result<Service> {
        let response = self
            .send(
                self.client
                    .patch(self.url(&format!(
                        "/projects/{}/services/{}",
                        project_id, service_id
                    )))
                    .json(patch),
            )
            .await?;
        self.read_json(response).await
    }

    pub async fn delete_service(&self, project_id: i64, service_id: i64) -> Result<()> {
        self.send(self.client.delete(self.url(&format!(
            "/projects/{}/services/{}",
            project_id, service_id
        ))))
        .await?;
        Ok(())
    }

    // --- logs ---

    pub async fn list_logs(
        &self,
        project_id: i64,
        service_id: i64,
        query: &LogQuery,
    ) -> Result<Vec<LogEntry>> {
        let mut params: Vec<(&str, String)> = vec![
            ("skip", query.skip.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(is_success) = query.is_success {
            params.push(("is_success", is_success.to_string()));
        }
        if let Some(status_code) = query.status_code {
            params.push(("status_code", status_code.to_string()));
        }
        if let Some(from_time) = query.from_time {
            params.push(("from_time", from_time.to_rfc3339()));
        }
        if let Some(to_time) = query.to_time {
            params.push(("to_time", to_time.to_rfc3339()));
        }

        let response = self
            .send(
                self.client
                    .get(self.url(&format!(
                        "/projects/{}/services/{}/logs/",
                        project_id, service_id
                    )))
                    .query(&params),
            )
            .await?;
        self.read_json(response).await
    }

    // --- health ---

    /// Unauthenticated health probe of the backend.
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self.send(self.client.get(self.url("/health"))).await?;
        self.read_json(response).await
    }

    /// Test connectivity to the backend without failing startup.
    pub async fn test_connectivity(&self) -> bool {
        match self.health().await {
            Ok(health) => {
                info!("Backend connectivity test successful: {}", health.status);
                true
            }
            Err(e) => {
                warn!("Backend connectivity test failed: {}", e);
                false
            }
        }
    }
}

/// Render a readable message from an error body.
///
/// The backend answers non-2xx with a JSON body whose `detail` field is
/// either a string or a structured validation list; anything else falls
/// back to the status line.
pub(crate) fn render_detail(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match &value["detail"] {
            Value::String(detail) => return detail.clone(),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| match item.get("msg").and_then(Value::as_str) {
                        Some(msg) => msg.to_string(),
                        None => item.to_string(),
                    })
                    .collect();
                if !parts.is_empty() {
                    return parts.join("; ");
                }
            }
            _ => {}
        }
    }

    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}
