//! HTTP client for the Blueprint backend
//!
//! Bearer-authenticated JSON over `reqwest`. Error responses are mapped onto
//! the crate's error taxonomy; a rejected credential ends the session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{ApiConfig, DEFAULT_BASE_URL};
use crate::domain::project::{NewProject, Project};
use crate::domain::task::{NewTask, Task, TaskStatus};
use crate::error::{Error, Result};

use super::RemoteSync;
use super::types::{
    AuthResponse, CreatedProject, ErrorBody, LoginRequest, ProjectDetail, ProjectEnvelope,
    ProjectsEnvelope, RegisterRequest, Session, StatusUpdate, Suggestion, TaskEnvelope,
    TasksEnvelope, User, UserFlow,
};

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// What a 404 on a given route refers to
#[derive(Debug, Clone, Copy)]
enum Resource<'a> {
    Project(&'a str),
    Task(&'a str),
    Other,
}

/// Blueprint API client
///
/// Cloning is cheap; clones share the HTTP connection pool and the session.
#[derive(Clone)]
pub struct HttpRemoteClient {
    http_client: HttpClient,
    base_url: String,
    session: Arc<RwLock<Option<Session>>>,
}

impl std::fmt::Debug for HttpRemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let has_session = self
            .session
            .try_read()
            .map(|s| s.is_some())
            .unwrap_or(false);
        f.debug_struct("HttpRemoteClient")
            .field("base_url", &self.base_url)
            .field("session", &has_session)
            .finish()
    }
}

/// Builder for creating an HttpRemoteClient
#[derive(Default)]
pub struct HttpRemoteClientBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    session: Option<Session>,
}

impl HttpRemoteClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API root, e.g. `http://localhost:8001`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Transport timeout; a request that exceeds it fails as a network error
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Start with an existing session
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> Result<HttpRemoteClient> {
        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::ConfigError(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(HttpRemoteClient {
            http_client,
            base_url,
            session: Arc::new(RwLock::new(self.session)),
        })
    }
}

impl HttpRemoteClient {
    pub fn builder() -> HttpRemoteClientBuilder {
        HttpRemoteClientBuilder::new()
    }

    /// Build a client from configuration, resuming a session from
    /// `BLUEPRINT_TOKEN` when it is set
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let token = config
            .resolved_token()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let mut builder = Self::builder()
            .base_url(config.resolved_base_url())
            .timeout_secs(config.timeout_secs);
        if let Some(token) = token {
            builder = builder.session(Session::from_token(token));
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current session, if any
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn token(&self) -> Result<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token().to_string())
            .ok_or(Error::NotAuthenticated)
    }

    /// Build an authenticated request; fails before any traffic without a session
    async fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.token().await?;
        Ok(self
            .http_client
            .request(method, self.url(path))
            .bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: Resource<'_>,
    ) -> Result<T> {
        let response = request.send().await.map_err(Error::NetworkError)?;
        let status = response.status();

        if !status.is_success() {
            return Err(self.handle_error_response(status, response, resource).await);
        }

        let body = response.text().await.map_err(Error::NetworkError)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Map an error response onto the error taxonomy
    async fn handle_error_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
        resource: Resource<'_>,
    ) -> Error {
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message())
            .unwrap_or_else(|_| body.clone());

        match status.as_u16() {
            400 | 422 => Error::Validation(detail),
            401 | 403 => {
                if self.session.write().await.take().is_some() {
                    warn!(status = status.as_u16(), "Credential rejected, session ended");
                }
                Error::Unauthorized(detail)
            }
            404 => match resource {
                Resource::Project(id) => Error::ProjectNotFound(id.to_string()),
                Resource::Task(id) => Error::TaskNotFound(id.to_string()),
                Resource::Other => Error::NotFound(detail),
            },
            code => Error::ServerError { status: code, body: detail },
        }
    }

    async fn authenticate<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<User> {
        let request = self.http_client.post(self.url(path)).json(payload);
        let auth: AuthResponse = self.send(request, Resource::Other).await?;

        let user = auth.user.clone();
        *self.session.write().await = Some(Session::from_auth(auth));
        info!(user_id = %user.id, "Session started");
        Ok(user)
    }
}

#[async_trait]
impl RemoteSync for HttpRemoteClient {
    async fn login(&self, email: &str, password: &str) -> Result<User> {
        debug!(email = %email, "Logging in");
        let payload = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/login", &payload).await
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        debug!(email = %email, username = %username, "Registering");
        let payload = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/register", &payload).await
    }

    async fn logout(&self) {
        if self.session.write().await.take().is_some() {
            info!("Session ended");
        }
    }

    async fn profile(&self) -> Result<User> {
        debug!("Fetching profile");
        let request = self.authed(Method::GET, "/user/profile").await?;
        self.send(request, Resource::Other).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        debug!("Listing projects");
        let request = self.authed(Method::GET, "/projects").await?;
        let envelope: ProjectsEnvelope = self.send(request, Resource::Other).await?;
        Ok(envelope.projects)
    }

    async fn get_project(&self, id: &str) -> Result<ProjectDetail> {
        debug!(project_id = %id, "Fetching project");
        let request = self
            .authed(Method::GET, &format!("/projects/{}", id))
            .await?;
        let envelope: ProjectEnvelope = self.send(request, Resource::Project(id)).await?;
        Ok(envelope.project)
    }

    async fn create_project(&self, request: &NewProject) -> Result<CreatedProject> {
        debug!(title = %request.title, "Creating project");
        let http_request = self.authed(Method::POST, "/projects").await?.json(request);
        let created: CreatedProject = self.send(http_request, Resource::Other).await?;

        info!(
            project_id = %created.project.id,
            tasks_created = created.tasks_created,
            "Project created"
        );
        Ok(created)
    }

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        debug!(project_id = %project_id, "Listing tasks");
        let request = self
            .authed(Method::GET, &format!("/projects/{}/tasks", project_id))
            .await?;
        let envelope: TasksEnvelope = self.send(request, Resource::Project(project_id)).await?;
        Ok(envelope.tasks)
    }

    async fn create_task(&self, project_id: &str, request: &NewTask) -> Result<Task> {
        debug!(project_id = %project_id, title = %request.title, "Creating task");
        let http_request = self
            .authed(Method::POST, &format!("/projects/{}/tasks", project_id))
            .await?
            .json(request);
        let envelope: TaskEnvelope = self
            .send(http_request, Resource::Project(project_id))
            .await?;
        Ok(envelope.into_task())
    }

    async fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
        debug!(task_id = %task_id, status = %status, "Updating task status");
        let request = self
            .authed(Method::PUT, &format!("/tasks/{}", task_id))
            .await?
            .json(&StatusUpdate { status });
        let envelope: TaskEnvelope = self.send(request, Resource::Task(task_id)).await?;
        Ok(envelope.into_task())
    }

    async fn get_flow(&self, project_id: &str) -> Result<UserFlow> {
        debug!(project_id = %project_id, "Fetching user flow");
        let request = self
            .authed(Method::GET, &format!("/projects/{}/flow", project_id))
            .await?;
        self.send(request, Resource::Project(project_id)).await
    }

    async fn get_suggestion(&self) -> Result<Suggestion> {
        debug!("Fetching suggestion");
        let request = self.authed(Method::GET, "/assistant/suggestion").await?;
        self.send(request, Resource::Other).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> HttpRemoteClient {
        // Nothing listens on port 9; any request that escapes fails loudly
        HttpRemoteClient::builder()
            .base_url("http://127.0.0.1:9/")
            .timeout_secs(1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let client = HttpRemoteClient::builder().build().unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = offline_client();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
        assert_eq!(client.url("/projects"), "http://127.0.0.1:9/api/projects");
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let err = HttpRemoteClient::builder().timeout_secs(0).build().unwrap_err();
        assert_eq!(err.code(), "E600");
    }

    #[test]
    fn test_from_config() {
        let config = ApiConfig {
            base_url: "http://api.example.test:8001".to_string(),
            timeout_secs: 5,
            token: None,
        };
        let client = HttpRemoteClient::from_config(&config).unwrap();
        assert!(client.base_url().starts_with("http"));
    }

    #[test]
    fn test_from_config_rejects_stored_token() {
        let config = ApiConfig {
            token: Some("persisted".to_string()),
            ..ApiConfig::default()
        };
        let err = HttpRemoteClient::from_config(&config).unwrap_err();
        assert_eq!(err.code(), "E600");
    }

    #[tokio::test]
    async fn test_calls_without_session_fail_before_network() {
        let client = offline_client();

        assert!(matches!(
            client.list_projects().await,
            Err(Error::NotAuthenticated)
        ));
        assert!(matches!(
            client.update_task_status("t-1", TaskStatus::Done).await,
            Err(Error::NotAuthenticated)
        ));
        assert!(matches!(client.get_suggestion().await, Err(Error::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_logout_destroys_session() {
        let client = HttpRemoteClient::builder()
            .session(Session::from_token("abc"))
            .build()
            .unwrap();
        assert!(client.is_authenticated().await);

        client.logout().await;
        assert!(!client.is_authenticated().await);
        assert!(matches!(client.profile().await, Err(Error::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_clones_share_session() {
        let client = offline_client();
        let clone = client.clone();
        *client.session.write().await = Some(Session::from_token("shared"));
        assert!(clone.is_authenticated().await);
    }

    #[test]
    fn test_debug_hides_token() {
        let client = HttpRemoteClient::builder()
            .session(Session::from_token("hidden-token"))
            .build()
            .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("hidden-token"));
        assert!(debug.contains("session: true"));
    }

    #[test]
    fn test_client_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpRemoteClient>();
    }
}
