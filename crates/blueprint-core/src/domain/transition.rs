//! Task status transitions
//!
//! A status change is a two-phase mutation: the new status is written to the
//! entity store immediately, then confirmed with the backend. Either outcome
//! re-derives the owning project's counts: confirmation with the backend's
//! copy of the task, failure after restoring the previous status.
//!
//! At most one transition per task may be in flight. A second request for the
//! same task is rejected with [`Error::TransitionInFlight`] rather than queued;
//! transitions on different tasks never wait on each other.
//!
//! Nothing here times out or retries. A confirmation that never resolves keeps
//! its task marked in flight until the caller drops the future, at which point
//! the guard rolls the task back.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::store::EntityStore;
use super::task::{NewTask, Task, TaskStatus};
use crate::error::{Error, Result};
use crate::remote::RemoteSync;

/// Pending-operation markers keyed by task id
type InFlightMarkers = Arc<Mutex<HashMap<String, Uuid>>>;

/// Marks a task as in flight for as long as it lives
///
/// Dropping the guard clears the marker. If the transition was applied but
/// never committed, dropping also restores the task's previous status.
pub(crate) struct InFlightGuard {
    markers: InFlightMarkers,
    store: EntityStore,
    task_id: String,
    token: Uuid,
    /// Status to restore if the guard is dropped uncommitted
    rollback_to: Option<TaskStatus>,
}

impl InFlightGuard {
    /// Record the pre-transition status so an uncommitted drop can restore it
    fn arm(&mut self, previous: TaskStatus) {
        self.rollback_to = Some(previous);
    }

    /// Keep the applied status and release the marker
    fn commit(mut self) {
        self.rollback_to = None;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.rollback_to.take() {
            self.store.restore_task_status(&self.task_id, previous);
        }

        let mut markers = self.markers.lock().unwrap_or_else(PoisonError::into_inner);
        if markers.get(&self.task_id) == Some(&self.token) {
            markers.remove(&self.task_id);
        }
    }
}

impl fmt::Debug for InFlightGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightGuard")
            .field("task_id", &self.task_id)
            .field("token", &self.token)
            .field("armed", &self.rollback_to.is_some())
            .finish()
    }
}

/// Applies status changes optimistically and reconciles them with the backend
pub struct StatusTransitionHandler<R: RemoteSync + ?Sized> {
    store: EntityStore,
    remote: Arc<R>,
    in_flight: InFlightMarkers,
}

impl<R: RemoteSync + ?Sized> Clone for StatusTransitionHandler<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            remote: self.remote.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<R: RemoteSync + ?Sized> fmt::Debug for StatusTransitionHandler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusTransitionHandler")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl<R: RemoteSync + ?Sized> StatusTransitionHandler<R> {
    pub fn new(store: EntityStore, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether a transition for `task_id` is awaiting confirmation
    pub fn is_in_flight(&self, task_id: &str) -> bool {
        self.markers().contains_key(task_id)
    }

    /// Ids of all tasks with a transition in flight, sorted
    pub fn in_flight(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.markers().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn markers(&self) -> std::sync::MutexGuard<'_, HashMap<String, Uuid>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the in-flight marker for a task, or report it busy
    fn acquire(&self, task_id: &str) -> Result<InFlightGuard> {
        let mut markers = self.markers();
        if markers.contains_key(task_id) {
            return Err(Error::TransitionInFlight(task_id.to_string()));
        }

        let token = Uuid::new_v4();
        markers.insert(task_id.to_string(), token);

        Ok(InFlightGuard {
            markers: self.in_flight.clone(),
            store: self.store.clone(),
            task_id: task_id.to_string(),
            token,
            rollback_to: None,
        })
    }

    /// Move a cached task to `status`.
    ///
    /// The new status is visible in the store before this returns control to
    /// the runtime. On success the backend's copy of the task replaces the
    /// cached one and the owning project's counts are re-derived. On any
    /// failure the previous status is restored and the error is returned.
    ///
    /// Any status may move to any other, including to itself.
    pub async fn transition(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
        if self.store.get_task(task_id).is_none() {
            return Err(Error::TaskNotFound(task_id.to_string()));
        }

        let mut guard = self.acquire(task_id).inspect_err(|_| {
            warn!(task_id = %task_id, status = %status, "Transition rejected, already in flight");
        })?;

        let previous = self
            .store
            .set_task_status(task_id, status)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        guard.arm(previous);

        debug!(task_id = %task_id, from = %previous, to = %status, "Transition applied locally");

        match self.remote.update_task_status(task_id, status).await {
            Ok(confirmed) => {
                let project_id = confirmed.project_id.clone();
                let stats = self.store.upsert_task(confirmed.clone());
                guard.commit();

                info!(
                    task_id = %task_id,
                    project_id = %project_id,
                    status = %confirmed.status,
                    progress = stats.map(|s| s.progress_percent),
                    "Transition confirmed"
                );
                Ok(confirmed)
            }
            Err(e) => {
                drop(guard);
                warn!(
                    task_id = %task_id,
                    restored = %previous,
                    code = e.code(),
                    error = %e,
                    "Transition failed, rolled back"
                );
                Err(e)
            }
        }
    }

    /// Create a task under a project.
    ///
    /// Nothing is cached until the backend accepts the task.
    pub async fn create_task(&self, project_id: &str, request: &NewTask) -> Result<Task> {
        match self.remote.create_task(project_id, request).await {
            Ok(task) => {
                let stats = self.store.upsert_task(task.clone());
                info!(
                    task_id = %task.id,
                    project_id = %project_id,
                    total = stats.map(|s| s.total),
                    "Task created"
                );
                Ok(task)
            }
            Err(e) => {
                warn!(project_id = %project_id, code = e.code(), error = %e, "Task creation failed");
                Err(e)
            }
        }
    }
}
