//! Scripted in-memory backend for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::domain::progress::TaskStats;
use crate::domain::project::{NewProject, Project, ProjectStatus};
use crate::domain::task::{NewTask, Task, TaskStatus};
use crate::error::{Error, Result};
use crate::remote::{CreatedProject, ProjectDetail, RemoteSync, Suggestion, User, UserFlow};

/// How the next calls should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Server,
    Unauthorized,
    NotFound,
}

impl Failure {
    fn to_error(self, resource: &str) -> Error {
        match self {
            Failure::Server => Error::ServerError {
                status: 503,
                body: "unavailable".to_string(),
            },
            Failure::Unauthorized => Error::Unauthorized("expired".to_string()),
            Failure::NotFound => Error::TaskNotFound(resource.to_string()),
        }
    }
}

#[derive(Default)]
pub struct FakeRemote {
    projects: Mutex<HashMap<String, Project>>,
    tasks: Mutex<Vec<Task>>,
    failure: Mutex<Option<Failure>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    /// Signalled whenever a status update reaches the backend
    pub entered: Arc<Notify>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicU32,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(self, id: &str, tasks: &[(&str, TaskStatus)]) -> Self {
        let now = Utc::now();
        self.projects.lock().unwrap().insert(
            id.to_string(),
            Project {
                id: id.to_string(),
                title: format!("Project {}", id),
                description: "A collaborative planning tool for small remote product teams".to_string(),
                status: ProjectStatus::Active,
                features: Vec::new(),
                validation_scores: None,
                task_count: 0,
                completed_tasks: 0,
                created_at: now,
            },
        );
        let mut stored = self.tasks.lock().unwrap();
        for (task_id, status) in tasks {
            stored.push(Task {
                id: task_id.to_string(),
                project_id: id.to_string(),
                title: format!("Task {}", task_id),
                description: None,
                status: *status,
                priority: Default::default(),
                created_at: now,
            });
        }
        drop(stored);
        self
    }

    pub fn fail_with(&self, failure: Failure) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    pub fn succeed(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Hold the next status update for `task_id` until the returned handle is notified
    pub fn gate(&self, task_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(task_id.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn backend_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| t.status)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn check(&self, resource: &str) -> Result<()> {
        match *self.failure.lock().unwrap() {
            Some(failure) => Err(failure.to_error(resource)),
            None => Ok(()),
        }
    }

    fn project_with_counts(&self, id: &str) -> Result<Project> {
        let mut project = self
            .projects
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;
        let tasks = self.tasks.lock().unwrap();
        project.apply_stats(&TaskStats::compute(
            tasks.iter().filter(|t| t.project_id == id),
        ));
        Ok(project)
    }

    fn user() -> User {
        User {
            id: "u-1".to_string(),
            username: "founder".to_string(),
            email: "founder@example.com".to_string(),
        }
    }
}

#[async_trait]
impl RemoteSync for FakeRemote {
    async fn login(&self, _email: &str, _password: &str) -> Result<User> {
        self.record("login");
        self.check("login")?;
        Ok(Self::user())
    }

    async fn register(&self, _username: &str, _email: &str, _password: &str) -> Result<User> {
        self.record("register");
        self.check("register")?;
        Ok(Self::user())
    }

    async fn logout(&self) {
        self.record("logout");
    }

    async fn profile(&self) -> Result<User> {
        self.record("profile");
        self.check("profile")?;
        Ok(Self::user())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.record("list_projects");
        self.check("projects")?;
        let ids: Vec<String> = self.projects.lock().unwrap().keys().cloned().collect();
        ids.iter().map(|id| self.project_with_counts(id)).collect()
    }

    async fn get_project(&self, id: &str) -> Result<ProjectDetail> {
        self.record(format!("get_project:{}", id));
        self.check(id)?;
        let project = self.project_with_counts(id)?;
        // The real backend embeds the task list in the project payload
        let tasks = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.project_id == id)
            .cloned()
            .collect();
        Ok(ProjectDetail {
            project,
            tasks: Some(tasks),
        })
    }

    async fn create_project(&self, request: &NewProject) -> Result<CreatedProject> {
        self.record("create_project");
        self.check("project")?;
        let id = format!("p-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        self.projects.lock().unwrap().insert(
            id.clone(),
            Project {
                id: id.clone(),
                title: request.title.clone(),
                description: request.description.clone(),
                status: ProjectStatus::Active,
                features: vec!["dashboard".to_string(), "reporting".to_string()],
                validation_scores: None,
                task_count: 0,
                completed_tasks: 0,
                created_at: now,
            },
        );
        {
            let mut tasks = self.tasks.lock().unwrap();
            for feature in ["dashboard", "reporting"] {
                tasks.push(Task {
                    id: format!("{}-{}", id, feature),
                    project_id: id.clone(),
                    title: format!("Implement {}", feature),
                    description: None,
                    status: TaskStatus::ToDo,
                    priority: Default::default(),
                    created_at: now,
                });
            }
        }
        Ok(CreatedProject {
            // Like the real backend, the response carries no counts
            project: self
                .projects
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::ProjectNotFound(id.clone()))?,
            analysis: None,
            tasks_created: 2,
        })
    }

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        self.record(format!("list_tasks:{}", project_id));
        self.check(project_id)?;
        if !self.projects.lock().unwrap().contains_key(project_id) {
            return Err(Error::ProjectNotFound(project_id.to_string()));
        }
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_task(&self, project_id: &str, request: &NewTask) -> Result<Task> {
        self.record(format!("create_task:{}", project_id));
        self.check(project_id)?;
        let task = Task {
            id: format!("t-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            project_id: project_id.to_string(),
            title: request.title.clone(),
            description: Some(request.description.clone()),
            status: TaskStatus::ToDo,
            priority: request.priority,
            created_at: Utc::now(),
        };
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
        self.record(format!("update_task_status:{}", task_id));
        self.entered.notify_one();

        let gate = self.gates.lock().unwrap().remove(task_id);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.check(task_id)?;
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        task.status = status;
        Ok(task.clone())
    }

    async fn get_flow(&self, project_id: &str) -> Result<UserFlow> {
        self.record(format!("get_flow:{}", project_id));
        self.check(project_id)?;
        Ok(UserFlow {
            flow_description: "User Registration/Login → User Settings/Profile".to_string(),
            flow_steps: vec![
                "User Registration/Login".to_string(),
                "User Settings/Profile".to_string(),
            ],
            pages_needed: vec!["Landing Page".to_string(), "Dashboard".to_string()],
        })
    }

    async fn get_suggestion(&self) -> Result<Suggestion> {
        self.record("get_suggestion");
        self.check("suggestion")?;
        Ok(Suggestion {
            suggestion: "Keep going!".to_string(),
            next_steps: vec!["Update task statuses".to_string()],
            project_progress: None,
        })
    }
}
