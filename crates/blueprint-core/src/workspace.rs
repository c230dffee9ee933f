//! Workspace - the user-level flows
//!
//! Ties the entity store, the transition handler and a remote together.
//! Refreshes write through to the store; a failed refresh keeps whatever was
//! cached and returns the error. A rejected credential ends the session and
//! drops the cache with it.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::filter::{ProjectFilter, TaskFilter};
use crate::domain::progress::{DashboardSummary, TaskStats};
use crate::domain::project::{NewProject, Project};
use crate::domain::store::EntityStore;
use crate::domain::task::{NewTask, Task, TaskPriority, TaskStatus};
use crate::domain::transition::StatusTransitionHandler;
use crate::error::{Error, Result};
use crate::remote::{RemoteSync, Suggestion, User, UserFlow};

pub struct Workspace<R: RemoteSync + ?Sized> {
    store: EntityStore,
    remote: Arc<R>,
    transitions: StatusTransitionHandler<R>,
}

impl<R: RemoteSync + ?Sized> Clone for Workspace<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            remote: self.remote.clone(),
            transitions: self.transitions.clone(),
        }
    }
}

impl<R: RemoteSync + ?Sized> Workspace<R> {
    pub fn new(remote: Arc<R>) -> Self {
        let store = EntityStore::new();
        let transitions = StatusTransitionHandler::new(store.clone(), remote.clone());
        Self {
            store,
            remote,
            transitions,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn transitions(&self) -> &StatusTransitionHandler<R> {
        &self.transitions
    }

    /// Pass an error through, ending the session if it was an auth failure
    fn observe(&self, error: Error) -> Error {
        if error.is_auth() {
            warn!(code = error.code(), "Session rejected, dropping cached data");
            self.store.clear();
        }
        error
    }

    /// Report a failed refresh; cached data is kept unless the session ended
    fn refresh_failed(&self, project_id: Option<&str>, error: Error) -> Error {
        self.store.report_refresh_failure(project_id, &error);
        self.observe(error)
    }

    // ========== Session ==========

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.remote.login(email, password).await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        self.remote.register(username, email, password).await
    }

    pub async fn profile(&self) -> Result<User> {
        self.remote.profile().await.map_err(|e| self.observe(e))
    }

    /// End the session and forget everything cached under it
    pub async fn logout(&self) {
        self.remote.logout().await;
        self.store.clear();
    }

    // ========== Refresh ==========

    /// Fetch every project; returns the cached list, oldest first
    pub async fn refresh_projects(&self) -> Result<Vec<Project>> {
        let projects = self
            .remote
            .list_projects()
            .await
            .map_err(|e| self.refresh_failed(None, e))?;

        debug!(count = projects.len(), "Projects refreshed");
        for project in projects {
            self.store.upsert_project(project);
        }
        Ok(self.store.projects())
    }

    /// Fetch one project, and its tasks when the backend embeds them
    pub async fn refresh_project(&self, id: &str) -> Result<Project> {
        let detail = self
            .remote
            .get_project(id)
            .await
            .map_err(|e| self.refresh_failed(Some(id), e))?;

        if let Some(tasks) = detail.tasks {
            self.store.upsert_tasks(id, tasks)?;
        }
        Ok(self.store.upsert_project(detail.project))
    }

    /// Fetch a project's tasks and re-derive its counts
    pub async fn refresh_tasks(&self, project_id: &str) -> Result<TaskStats> {
        let tasks = self
            .remote
            .list_tasks(project_id)
            .await
            .map_err(|e| self.refresh_failed(Some(project_id), e))?;

        self.store.upsert_tasks(project_id, tasks)
    }

    // ========== Mutations ==========

    /// Validate and create a project, then load the tasks the backend seeded
    ///
    /// A failure to load the seeded tasks does not undo the creation; the
    /// project is returned with whatever counts the backend reported.
    pub async fn create_project(&self, title: &str, description: &str) -> Result<Project> {
        let request = NewProject::new(title, description)?;

        let created = self
            .remote
            .create_project(&request)
            .await
            .map_err(|e| self.observe(e))?;
        let project_id = created.project.id.clone();
        self.store.upsert_project(created.project);

        info!(
            project_id = %project_id,
            tasks_created = created.tasks_created,
            "Project created"
        );

        if let Err(e) = self.refresh_tasks(&project_id).await {
            warn!(project_id = %project_id, error = %e, "Seeded tasks not loaded");
        }

        self.store
            .get_project(&project_id)
            .ok_or(Error::ProjectNotFound(project_id))
    }

    /// Validate and create a task
    pub async fn create_task(
        &self,
        project_id: &str,
        title: &str,
        description: &str,
        priority: TaskPriority,
    ) -> Result<Task> {
        let request = NewTask::new(title, description, priority)?;

        let task = self
            .transitions
            .create_task(project_id, &request)
            .await
            .map_err(|e| self.observe(e))?;

        // Counts can only be derived once the full task set is known
        if self.store.get_tasks(project_id).is_none()
            && let Err(e) = self.refresh_tasks(project_id).await
        {
            warn!(project_id = %project_id, error = %e, "Task list not loaded after create");
        }
        Ok(task)
    }

    /// Move a task to a new status, then refresh its project
    ///
    /// The transition's outcome is final once confirmed; a failed follow-up
    /// refresh is reported on the store's event channel but not returned.
    pub async fn transition(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
        let task = self
            .transitions
            .transition(task_id, status)
            .await
            .map_err(|e| self.observe(e))?;

        if let Err(e) = self.refresh_project(&task.project_id).await {
            warn!(project_id = %task.project_id, error = %e, "Project refresh after transition failed");
        }
        Ok(task)
    }

    // ========== Analysis ==========

    pub async fn flow(&self, project_id: &str) -> Result<UserFlow> {
        self.remote
            .get_flow(project_id)
            .await
            .map_err(|e| self.observe(e))
    }

    pub async fn suggestion(&self) -> Result<Suggestion> {
        self.remote
            .get_suggestion()
            .await
            .map_err(|e| self.observe(e))
    }

    // ========== Views ==========

    pub fn dashboard(&self) -> DashboardSummary {
        self.store.dashboard()
    }

    /// Cached tasks of a project matching `filter`, in fetch order
    ///
    /// Empty when the project's tasks have not been fetched.
    pub fn tasks_view(&self, project_id: &str, filter: &TaskFilter) -> Vec<Task> {
        let tasks = self.store.get_tasks(project_id).unwrap_or_default();
        filter.apply(&tasks).into_iter().cloned().collect()
    }

    /// Cached projects matching `filter`, oldest first
    pub fn projects_view(&self, filter: &ProjectFilter) -> Vec<Project> {
        let projects = self.store.projects();
        filter.apply(&projects).into_iter().cloned().collect()
    }
}
