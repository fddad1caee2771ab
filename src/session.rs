//! Session lifecycle: authentication, identity, token persistence

use crate::client::RemoteClient;
use crate::errors::{DashboardError, Result};
use crate::models::{Credentials, User};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Injected persistence for the session token, so the session logic is
/// testable without a real storage backend.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, token: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Token store backed by a plain file
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let token = contents.trim().to_string();
                Ok((!token.is_empty()).then_some(token))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DashboardError::Store(e)),
        }
    }

    async fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, token).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DashboardError::Store(e)),
        }
    }
}

/// In-memory token store for tests and token-less runs
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.token.read().await.clone())
    }

    async fn save(&self, token: &str) -> Result<()> {
        *self.token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.token.write().await = None;
        Ok(())
    }
}

/// Owns the authentication token and the current user identity.
///
/// Everything downstream is gated on this: no sync cycle runs without a
/// valid session, and any 401 observed later funnels back into `logout`.
pub struct SessionManager {
    client: Arc<RemoteClient>,
    store: Box<dyn TokenStore>,
    user: RwLock<Option<User>>,
}

impl SessionManager {
    pub fn new(client: Arc<RemoteClient>, store: Box<dyn TokenStore>) -> Self {
        Self {
            client,
            store,
            user: RwLock::new(None),
        }
    }

    /// Validate a persisted token on startup.
    ///
    /// Any validation failure clears the persisted token and leaves the
    /// session unauthenticated; there is no retry.
    pub async fn restore(&self) -> Result<Option<User>> {
        let Some(token) = self.store.load().await? else {
            return Ok(None);
        };

        self.client.set_token(token).await;

        match self.client.me().await {
            Ok(user) => {
                info!("Restored session for {}", user.email);
                *self.user.write().await = Some(user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                warn!("Persisted token rejected, clearing it: {}", e);
                self.client.clear_token().await;
                if let Err(e) = self.store.clear().await {
                    warn!("Failed to clear persisted token: {}", e);
                }
                Ok(None)
            }
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let credentials = validated(email, password)?;
        self.client.register(&credentials).await
    }

    /// Exchange credentials for a token, persist it, and resolve the user.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let credentials = validated(email, password)?;

        let token = self.client.login(&credentials).await?;
        self.client.set_token(&token).await;

        if let Err(e) = self.store.save(&token).await {
            warn!("Failed to persist session token: {}", e);
        }

        let user = self.client.me().await?;
        info!("Signed in as {}", user.email);
        *self.user.write().await = Some(user.clone());
        Ok(user)
    }

    /// Tear the session down. Never fails; store errors are logged.
    pub async fn logout(&self) {
        *self.user.write().await = None;
        self.client.clear_token().await;
        if let Err(e) = self.store.clear().await {
            warn!("Failed to clear persisted token: {}", e);
        }
        info!("Signed out");
    }

    pub async fn current_user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.user.read().await.is_some()
    }
}

/// Required-field check, raised before any remote call.
fn validated(email: &str, password: &str) -> Result<Credentials> {
    let email = email.trim();
    let password = password.trim();

    if email.is_empty() {
        return Err(DashboardError::Validation("email is required".to_string()));
    }
    if password.is_empty() {
        return Err(DashboardError::Validation(
            "password is required".to_string(),
        ));
    }

    Ok(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use tokio_test::assert_ok;

    fn user_body() -> serde_json::Value {
        serde_json::json!({
            "id": 9,
            "email": "ops@example.com",
            "is_active": true,
            "created_at": "2026-08-01T09:00:00Z"
        })
    }

    fn client_for(server: &MockServer) -> Arc<RemoteClient> {
        Arc::new(RemoteClient::new(server.uri(), Duration::from_secs(2)).unwrap())
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));

        assert!(store.load().await.unwrap().is_none());
        tokio_test::assert_ok!(store.save("tok-123").await);
        assert_eq!(store.load().await.unwrap().as_deref(), Some("tok-123"));
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());

        // clearing twice is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_login_validates_fields_before_any_request() {
        // No mock server mounted: a remote call would fail loudly.
        let client = Arc::new(
            RemoteClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap(),
        );
        let session = SessionManager::new(client, Box::new(MemoryTokenStore::default()));

        let err = session.login("  ", "secret").await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));
    }

    #[tokio::test]
    async fn test_login_persists_token_and_resolves_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "tok-123"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let store = Box::new(MemoryTokenStore::default());
        let session = SessionManager::new(Arc::clone(&client), store);

        let user = session.login("ops@example.com", "secret").await.unwrap();
        assert_eq!(user.email, "ops@example.com");
        assert!(session.is_authenticated().await);
        assert!(client.has_token().await);
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_clears_it() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "Could not validate credentials"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let store = MemoryTokenStore::default();
        store.save("stale-token").await.unwrap();
        let session = SessionManager::new(Arc::clone(&client), Box::new(store));

        let restored = session.restore().await.unwrap();
        assert!(restored.is_none());
        assert!(!session.is_authenticated().await);
        assert!(!client.has_token().await);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "tok-123"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let session = SessionManager::new(Arc::clone(&client), Box::new(MemoryTokenStore::default()));

        session.login("ops@example.com", "secret").await.unwrap();
        session.logout().await;

        assert!(!session.is_authenticated().await);
        assert!(!client.has_token().await);
        assert!(session.current_user().await.is_none());
    }
}
