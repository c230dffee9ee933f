//! Task and project filtering
//!
//! Filters return the matching subsequence of their input in its original
//! relative order. They never reorder, deduplicate or clone.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::project::{Project, ProjectStatus};
use super::task::{Task, TaskStatus};
use crate::error::{Error, Result};

/// Status constraint for a task listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatusFilter {
    #[default]
    All,
    ToDo,
    InProgress,
    Done,
}

impl TaskStatusFilter {
    pub fn matches(&self, status: TaskStatus) -> bool {
        match self {
            TaskStatusFilter::All => true,
            TaskStatusFilter::ToDo => status == TaskStatus::ToDo,
            TaskStatusFilter::InProgress => status == TaskStatus::InProgress,
            TaskStatusFilter::Done => status == TaskStatus::Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatusFilter::All => "all",
            TaskStatusFilter::ToDo => "to-do",
            TaskStatusFilter::InProgress => "in-progress",
            TaskStatusFilter::Done => "done",
        }
    }
}

impl From<TaskStatus> for TaskStatusFilter {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::ToDo => TaskStatusFilter::ToDo,
            TaskStatus::InProgress => TaskStatusFilter::InProgress,
            TaskStatus::Done => TaskStatusFilter::Done,
        }
    }
}

impl fmt::Display for TaskStatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(TaskStatusFilter::All);
        }
        TaskStatus::parse(s).map(TaskStatusFilter::from).ok_or_else(|| {
            Error::Validation(format!(
                "Unknown task filter '{}'. Expected one of: all, todo, in-progress, done",
                s
            ))
        })
    }
}

/// Criteria for a task listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: TaskStatusFilter,
    /// Case-insensitive substring matched against title and description
    pub query: Option<String>,
}

impl TaskFilter {
    pub fn new(status: TaskStatusFilter) -> Self {
        Self {
            status,
            query: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.status.matches(task.status)
            && text_matches(
                self.query.as_deref(),
                &task.title,
                task.description.as_deref(),
            )
    }

    /// Matching tasks in their original order
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|task| self.matches(task)).collect()
    }
}

/// Status constraint for a project listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatusFilter {
    #[default]
    All,
    Active,
    Completed,
    Paused,
}

impl ProjectStatusFilter {
    pub fn matches(&self, status: ProjectStatus) -> bool {
        match self {
            ProjectStatusFilter::All => true,
            ProjectStatusFilter::Active => status == ProjectStatus::Active,
            ProjectStatusFilter::Completed => status == ProjectStatus::Completed,
            ProjectStatusFilter::Paused => status == ProjectStatus::Paused,
        }
    }
}

impl std::str::FromStr for ProjectStatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ProjectStatusFilter::All),
            "active" => Ok(ProjectStatusFilter::Active),
            "completed" => Ok(ProjectStatusFilter::Completed),
            "paused" => Ok(ProjectStatusFilter::Paused),
            _ => Err(Error::Validation(format!(
                "Unknown project filter '{}'. Expected one of: all, active, completed, paused",
                s
            ))),
        }
    }
}

/// Criteria for a project listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub status: ProjectStatusFilter,
    pub query: Option<String>,
}

impl ProjectFilter {
    pub fn new(status: ProjectStatusFilter) -> Self {
        Self {
            status,
            query: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn matches(&self, project: &Project) -> bool {
        self.status.matches(project.status)
            && text_matches(
                self.query.as_deref(),
                &project.title,
                Some(&project.description),
            )
    }

    pub fn apply<'a>(&self, projects: &'a [Project]) -> Vec<&'a Project> {
        projects
            .iter()
            .filter(|project| self.matches(project))
            .collect()
    }
}

fn text_matches(query: Option<&str>, title: &str, description: Option<&str>) -> bool {
    let Some(query) = query else {
        return true;
    };
    let needle = query.to_lowercase();

    title.to_lowercase().contains(&needle)
        || description.is_some_and(|d| d.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn task(id: &str, status: TaskStatus, title: &str, description: Option<&str>) -> Task {
        Task {
            id: id.to_string(),
            project_id: "p-1".to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            status,
            priority: Default::default(),
            created_at: Utc::now(),
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("1", TaskStatus::Done, "Build login system", Some("Secure auth")),
            task("2", TaskStatus::ToDo, "Payment integration", None),
            task("3", TaskStatus::InProgress, "Create dashboard", Some("Key METRICS")),
            task("4", TaskStatus::ToDo, "Export functionality", Some("CSV export")),
        ]
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_all_returns_input_unchanged() {
        let tasks = sample();
        let filtered = TaskFilter::default().apply(&tasks);
        assert_eq!(ids(&filtered), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_status_filter_preserves_order() {
        let tasks = sample();
        let filtered = TaskFilter::new(TaskStatusFilter::ToDo).apply(&tasks);
        assert_eq!(ids(&filtered), vec!["2", "4"]);
    }

    #[test]
    fn test_query_is_case_insensitive_over_title_and_description() {
        let tasks = sample();

        let by_title = TaskFilter::default().with_query("LOGIN").apply(&tasks);
        assert_eq!(ids(&by_title), vec!["1"]);

        let by_description = TaskFilter::default().with_query("metrics").apply(&tasks);
        assert_eq!(ids(&by_description), vec!["3"]);
    }

    #[test]
    fn test_query_and_status_combine() {
        let tasks = sample();
        let filtered = TaskFilter::new(TaskStatusFilter::ToDo)
            .with_query("export")
            .apply(&tasks);
        assert_eq!(ids(&filtered), vec!["4"]);
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let tasks = sample();
        assert_eq!(TaskFilter::default().with_query("").apply(&tasks).len(), 4);
    }

    #[test]
    fn test_filter_from_str() {
        assert_eq!("all".parse::<TaskStatusFilter>().unwrap(), TaskStatusFilter::All);
        assert_eq!("todo".parse::<TaskStatusFilter>().unwrap(), TaskStatusFilter::ToDo);
        assert_eq!(
            "In Progress".parse::<TaskStatusFilter>().unwrap(),
            TaskStatusFilter::InProgress
        );
        assert!("stuck".parse::<TaskStatusFilter>().is_err());
    }

    #[test]
    fn test_filter_display_roundtrips_through_parse() {
        for filter in [
            TaskStatusFilter::All,
            TaskStatusFilter::ToDo,
            TaskStatusFilter::InProgress,
            TaskStatusFilter::Done,
        ] {
            assert_eq!(filter.to_string().parse::<TaskStatusFilter>().unwrap(), filter);
        }
    }

    #[test]
    fn test_project_filter() {
        let now = Utc::now();
        let make = |id: &str, status: ProjectStatus, title: &str, description: &str| Project {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            status,
            features: Vec::new(),
            validation_scores: None,
            task_count: 0,
            completed_tasks: 0,
            created_at: now,
        };
        let projects = vec![
            make("a", ProjectStatus::Active, "TaskFlow", "Remote team planning"),
            make("b", ProjectStatus::Paused, "InvoiceBot", "Billing for freelancers"),
            make("c", ProjectStatus::Active, "LearnHub", "Online courses for TEAMS"),
        ];

        let active: Vec<&str> = ProjectFilter::new(ProjectStatusFilter::Active)
            .apply(&projects)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(active, vec!["a", "c"]);

        let teams: Vec<&str> = ProjectFilter::default()
            .with_query("team")
            .apply(&projects)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(teams, vec!["a", "c"]);

        assert!("archived".parse::<ProjectStatusFilter>().is_err());
    }

    fn arb_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::ToDo),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Done),
        ]
    }

    proptest! {
        #[test]
        fn prop_status_filter_is_sound(
            statuses in prop::collection::vec(arb_status(), 0..48),
            wanted in arb_status(),
        ) {
            let tasks: Vec<Task> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| task(&i.to_string(), *s, "t", None))
                .collect();

            let filtered = TaskFilter::new(wanted.into()).apply(&tasks);
            prop_assert!(filtered.len() <= tasks.len());
            prop_assert!(filtered.iter().all(|t| t.status == wanted));
            prop_assert_eq!(
                filtered.len(),
                tasks.iter().filter(|t| t.status == wanted).count()
            );

            let everything = TaskFilter::new(TaskStatusFilter::All).apply(&tasks);
            let cloned: Vec<Task> = everything.into_iter().cloned().collect();
            prop_assert_eq!(cloned, tasks);
        }
    }
}
