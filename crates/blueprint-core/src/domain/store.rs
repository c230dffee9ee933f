//! Entity store
//!
//! Session-scoped cache of every project and task the client has seen. The
//! store is the single owner of these records; everything else reads copies.
//!
//! Derived project fields (`task_count`, `completed_tasks`) are recomputed
//! from the cached task set on every task fetch, confirmed mutation and
//! rollback. The optimistic status write is the one exception: it touches only
//! the task, and the owning project is recomputed once the backend answers.
//!
//! An optimistic status stays pending until it is confirmed or rolled back. A
//! task fetch that lands in between keeps the pending status over the fetched
//! one.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::progress::{DashboardSummary, TaskStats};
use super::project::Project;
use super::task::{Task, TaskStatus};
use crate::error::{Error, Result};

/// Capacity of the change notification channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notification emitted after every store mutation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    ProjectUpserted {
        project_id: String,
    },
    /// A project's full task set was replaced by a fetch
    TasksReplaced {
        project_id: String,
    },
    TaskUpserted {
        project_id: String,
        task_id: String,
    },
    /// Optimistic status write, not yet confirmed
    TaskStatusChanged {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
    TaskStatusRolledBack {
        task_id: String,
        restored: TaskStatus,
    },
    /// A refresh failed and cached data was kept
    RefreshFailed {
        project_id: Option<String>,
        code: &'static str,
    },
    Cleared,
}

#[derive(Debug, Default)]
struct StoreState {
    projects: HashMap<String, Project>,
    /// Every known task by id
    tasks: HashMap<String, Task>,
    /// Ordered task ids for projects whose task set has been fetched
    project_tasks: HashMap<String, Vec<String>>,
    /// Optimistic statuses awaiting confirmation, by task id
    pending: HashMap<String, TaskStatus>,
}

impl StoreState {
    fn tasks_for(&self, project_id: &str) -> Option<Vec<Task>> {
        self.project_tasks.get(project_id).map(|ids| {
            ids.iter()
                .filter_map(|id| self.tasks.get(id))
                .cloned()
                .collect()
        })
    }

    fn stats_for(&self, project_id: &str) -> Option<TaskStats> {
        self.project_tasks.get(project_id).map(|ids| {
            TaskStats::compute(ids.iter().filter_map(|id| self.tasks.get(id)))
        })
    }

    /// Re-derive a project's counts from its cached tasks, if both are known
    fn recompute(&mut self, project_id: &str) -> Option<TaskStats> {
        let stats = self.stats_for(project_id)?;
        if let Some(project) = self.projects.get_mut(project_id) {
            project.apply_stats(&stats);
        }
        Some(stats)
    }
}

/// In-memory cache of projects and tasks for the current session
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Debug, Clone)]
pub struct EntityStore {
    state: Arc<RwLock<StoreState>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            events,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Insert or replace a project; returns the stored copy
    pub fn upsert_project(&self, project: Project) -> Project {
        let mut project = project;
        let project_id = project.id.clone();
        {
            let mut state = self.write();
            if let Some(stats) = state.stats_for(&project_id) {
                project.apply_stats(&stats);
            }
            state.projects.insert(project_id.clone(), project.clone());
        }

        debug!(project_id = %project_id, "Project upserted");
        self.emit(StoreEvent::ProjectUpserted { project_id });
        project
    }

    /// Replace the full task set of a project with a fresh fetch
    pub fn upsert_tasks(&self, project_id: &str, mut tasks: Vec<Task>) -> Result<TaskStats> {
        if let Some(stray) = tasks.iter().find(|t| t.project_id != project_id) {
            return Err(Error::InvalidResponse(format!(
                "task '{}' belongs to project '{}', not '{}'",
                stray.id, stray.project_id, project_id
            )));
        }

        let (stats, kept) = {
            let mut state = self.write();

            let mut kept = 0;
            for task in &mut tasks {
                if let Some(status) = state.pending.get(&task.id) {
                    task.status = *status;
                    kept += 1;
                }
            }
            let stats = TaskStats::compute(&tasks);

            if let Some(previous) = state.project_tasks.remove(project_id) {
                for id in previous {
                    state.tasks.remove(&id);
                }
            }

            let ids = tasks.iter().map(|t| t.id.clone()).collect();
            for task in tasks {
                state.tasks.insert(task.id.clone(), task);
            }
            state.project_tasks.insert(project_id.to_string(), ids);

            if let Some(project) = state.projects.get_mut(project_id) {
                project.apply_stats(&stats);
            }
            (stats, kept)
        };

        debug!(
            project_id = %project_id,
            total = stats.total,
            done = stats.done,
            pending_kept = kept,
            "Tasks replaced"
        );
        self.emit(StoreEvent::TasksReplaced {
            project_id: project_id.to_string(),
        });
        Ok(stats)
    }

    /// Insert or replace a single task and re-derive its project's counts
    ///
    /// The task's status is taken as confirmed, replacing any pending one.
    /// Returns the project's new statistics when its task set is loaded.
    pub fn upsert_task(&self, task: Task) -> Option<TaskStats> {
        let project_id = task.project_id.clone();
        let task_id = task.id.clone();

        let stats = {
            let mut state = self.write();
            state.pending.remove(&task_id);
            let is_new = state.tasks.insert(task_id.clone(), task).is_none();
            if is_new && let Some(ids) = state.project_tasks.get_mut(&project_id) {
                ids.push(task_id.clone());
            }
            state.recompute(&project_id)
        };

        self.emit(StoreEvent::TaskUpserted {
            project_id,
            task_id,
        });
        stats
    }

    /// Optimistically set a task's status without touching its project
    ///
    /// Returns the previous status, or `None` if the task is not cached.
    pub fn set_task_status(&self, task_id: &str, status: TaskStatus) -> Option<TaskStatus> {
        let previous = {
            let mut state = self.write();
            let task = state.tasks.get_mut(task_id)?;
            let previous = std::mem::replace(&mut task.status, status);
            state.pending.insert(task_id.to_string(), status);
            previous
        };

        self.emit(StoreEvent::TaskStatusChanged {
            task_id: task_id.to_string(),
            from: previous,
            to: status,
        });
        Some(previous)
    }

    /// Undo an optimistic status write and re-derive the owning project
    ///
    /// A sibling confirmed in the meantime may have counted the optimistic
    /// status, so the project is recomputed rather than left alone.
    pub fn restore_task_status(&self, task_id: &str, status: TaskStatus) {
        let restored = {
            let mut state = self.write();
            state.pending.remove(task_id);
            let project_id = match state.tasks.get_mut(task_id) {
                Some(task) => {
                    task.status = status;
                    Some(task.project_id.clone())
                }
                None => None,
            };
            if let Some(project_id) = &project_id {
                state.recompute(project_id);
            }
            project_id.is_some()
        };

        if restored {
            self.emit(StoreEvent::TaskStatusRolledBack {
                task_id: task_id.to_string(),
                restored: status,
            });
        } else {
            warn!(task_id = %task_id, "Rollback target no longer cached");
        }
    }

    /// Re-derive a project's counts from its cached tasks
    pub fn recompute_project(&self, project_id: &str) -> Option<TaskStats> {
        let stats = self.write().recompute(project_id);
        if stats.is_some() {
            self.emit(StoreEvent::ProjectUpserted {
                project_id: project_id.to_string(),
            });
        }
        stats
    }

    /// Record that a refresh failed; cached data stays as it was
    pub fn report_refresh_failure(&self, project_id: Option<&str>, error: &Error) {
        warn!(
            project_id = project_id.unwrap_or("*"),
            code = error.code(),
            error = %error,
            "Refresh failed, keeping cached data"
        );
        self.emit(StoreEvent::RefreshFailed {
            project_id: project_id.map(str::to_string),
            code: error.code(),
        });
    }

    pub fn get_project(&self, id: &str) -> Option<Project> {
        self.read().projects.get(id).cloned()
    }

    /// Tasks of a project in fetch order, or `None` if never fetched
    pub fn get_tasks(&self, project_id: &str) -> Option<Vec<Task>> {
        self.read().tasks_for(project_id)
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.read().tasks.get(id).cloned()
    }

    /// Statistics for a project's cached tasks, or `None` if never fetched
    pub fn project_stats(&self, project_id: &str) -> Option<TaskStats> {
        self.read().stats_for(project_id)
    }

    /// All cached projects, oldest first
    pub fn projects(&self) -> Vec<Project> {
        let mut projects: Vec<Project> = self.read().projects.values().cloned().collect();
        projects.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        projects
    }

    pub fn dashboard(&self) -> DashboardSummary {
        DashboardSummary::compute(&self.projects())
    }

    /// Drop everything (session ended)
    pub fn clear(&self) {
        *self.write() = StoreState::default();
        self.emit(StoreEvent::Cleared);
    }
}
