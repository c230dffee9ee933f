//! Progress calculation
//!
//! Pure functions deriving per-status counts and percent-complete from a task
//! collection. Results depend only on the multiset of task statuses, so the
//! same tasks in any order always give the same answer.

use serde::{Deserialize, Serialize};

use super::project::{Project, ProjectStatus};
use super::task::{Task, TaskStatus};

/// Status buckets and completion for a set of tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: u32,
    pub todo: u32,
    pub in_progress: u32,
    pub done: u32,
    /// Percent of tasks done, rounded to one decimal place
    pub progress_percent: f64,
}

impl TaskStats {
    /// Compute statistics for a project's tasks
    pub fn compute<'a, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut stats = TaskStats::default();

        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::ToDo => stats.todo += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Done => stats.done += 1,
            }
        }

        stats.progress_percent = percent(stats.done, stats.total);
        stats
    }

    /// Count for a single status bucket
    pub fn count(&self, status: TaskStatus) -> u32 {
        match status {
            TaskStatus::ToDo => self.todo,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Done => self.done,
        }
    }
}

/// `part / whole * 100` rounded to one decimal place; zero when `whole` is zero
pub fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let part = part.min(whole);
    round1(f64::from(part) / f64::from(whole) * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Portfolio-wide totals across every cached project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_projects: u32,
    pub active_projects: u32,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub overall_progress: f64,
}

impl DashboardSummary {
    pub fn compute<'a, I>(projects: I) -> Self
    where
        I: IntoIterator<Item = &'a Project>,
    {
        let mut summary = DashboardSummary::default();

        for project in projects {
            summary.total_projects += 1;
            if project.status == ProjectStatus::Active {
                summary.active_projects += 1;
            }
            summary.total_tasks += project.task_count;
            summary.completed_tasks += project.completed_tasks;
        }

        summary.overall_progress = percent(summary.completed_tasks, summary.total_tasks);
        summary
    }
}
