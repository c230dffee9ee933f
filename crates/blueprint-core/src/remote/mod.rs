//! Remote sync - the Blueprint backend API
//!
//! This module provides:
//! - The `RemoteSync` trait, the only seam through which the core talks to the backend
//! - An HTTP implementation over `reqwest`
//! - Wire types for requests and responses
//!
//! Every call is asynchronous and may fail. Nothing here retries or caches.

mod client;
mod types;

use async_trait::async_trait;

use crate::domain::project::{NewProject, Project};
use crate::domain::task::{NewTask, Task, TaskStatus};
use crate::error::Result;

pub use client::{HttpRemoteClient, HttpRemoteClientBuilder};
pub use types::{
    AuthResponse, CreatedProject, LoginRequest, ProjectDetail, RegisterRequest, Session,
    Suggestion, User, UserFlow,
};

/// Operations the core needs from the backend
#[async_trait]
pub trait RemoteSync: Send + Sync {
    // ========== Session ==========

    /// Authenticate and start a session
    async fn login(&self, email: &str, password: &str) -> Result<User>;

    /// Create an account and start a session
    async fn register(&self, username: &str, email: &str, password: &str) -> Result<User>;

    /// End the session; never touches the network
    async fn logout(&self);

    async fn profile(&self) -> Result<User>;

    // ========== Projects ==========

    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Fetch one project, with its tasks when the backend embeds them
    async fn get_project(&self, id: &str) -> Result<ProjectDetail>;

    async fn create_project(&self, request: &NewProject) -> Result<CreatedProject>;

    // ========== Tasks ==========

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>>;

    async fn create_task(&self, project_id: &str, request: &NewTask) -> Result<Task>;

    /// Confirm a status change; returns the task as stored by the backend
    async fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<Task>;

    // ========== Analysis ==========

    async fn get_flow(&self, project_id: &str) -> Result<UserFlow>;

    async fn get_suggestion(&self) -> Result<Suggestion>;
}
