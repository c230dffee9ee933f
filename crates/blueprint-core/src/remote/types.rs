//! Request and response payloads for the Blueprint backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::project::Project;
use crate::domain::task::{Task, TaskStatus};

/// Account as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Response to login and register
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("user", &self.user)
            .finish()
    }
}

/// An authenticated session
///
/// Created by login or register, destroyed by logout or by the backend
/// rejecting the token.
#[derive(Clone)]
pub struct Session {
    access_token: String,
    /// Unknown when resumed from a bare token
    pub user: Option<User>,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn from_auth(auth: AuthResponse) -> Self {
        Self {
            access_token: auth.access_token,
            user: Some(auth.user),
            started_at: Utc::now(),
        }
    }

    /// Resume with a token obtained elsewhere
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            access_token: token.into(),
            user: None,
            started_at: Utc::now(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("user", &self.user)
            .field("started_at", &self.started_at)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub status: TaskStatus,
}

/// A project payload, optionally with its tasks embedded
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    #[serde(default)]
    pub tasks: Option<Vec<Task>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectEnvelope {
    pub project: ProjectDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsEnvelope {
    #[serde(default)]
    pub projects: Vec<Project>,
}

/// Response to project creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedProject {
    pub project: Project,
    /// Raw analysis output, shown as-is
    #[serde(default)]
    pub analysis: Option<serde_json::Value>,
    /// Number of tasks the backend seeded from the description
    #[serde(default)]
    pub tasks_created: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksEnvelope {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A single task, wrapped in `{"task": ...}` or bare
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TaskEnvelope {
    Wrapped { task: Task },
    Bare(Task),
}

impl TaskEnvelope {
    pub fn into_task(self) -> Task {
        match self {
            TaskEnvelope::Wrapped { task } | TaskEnvelope::Bare(task) => task,
        }
    }
}

/// Suggested user flow for a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFlow {
    pub flow_description: String,
    #[serde(default)]
    pub flow_steps: Vec<String>,
    #[serde(default)]
    pub pages_needed: Vec<String>,
}

/// Advice for the user's most recent project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_progress: Option<f64>,
}

/// FastAPI-style error body
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Human-readable detail, whether the backend sent a string or a list
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.get("msg")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| item.to_string())
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}
