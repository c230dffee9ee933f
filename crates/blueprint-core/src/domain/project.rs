//! Project entity
//!
//! A tracked product idea. Identity, title, description and analysis output
//! come from the backend; `task_count` and `completed_tasks` are derived from
//! the project's tasks whenever the client knows them, and progress is always
//! computed from those two counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::progress::{TaskStats, percent};
use crate::error::{Error, Result};

/// Minimum description length accepted for a new project
pub const MIN_DESCRIPTION_CHARS: usize = 50;

/// Project status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Paused,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(ProjectStatus::Active),
            "completed" => Some(ProjectStatus::Completed),
            "paused" => Some(ProjectStatus::Paused),
            _ => None,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scores and advice produced by the analysis service
///
/// Stored and displayed as-is. Each score is nominally on a 0-10 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationScores {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_need: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_feasibility: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ValidationScores {
    /// Bar width, as a percentage, for a score on the 0-10 scale
    pub fn display_width(score: f64) -> f64 {
        (score * 10.0).clamp(0.0, 100.0)
    }

    pub fn is_empty(&self) -> bool {
        self.market_need.is_none()
            && self.technical_feasibility.is_none()
            && self.user_value.is_none()
            && self.feedback.is_none()
            && self.suggestions.is_empty()
    }
}

/// Analysis output attached to a project
///
/// The analysis service returns structured scores, but may also hand back
/// prose when the model answers free-form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationReport {
    Scored(ValidationScores),
    Freeform(String),
}

impl ValidationReport {
    pub fn scores(&self) -> Option<&ValidationScores> {
        match self {
            ValidationReport::Scored(scores) => Some(scores),
            ValidationReport::Freeform(_) => None,
        }
    }
}

fn deserialize_report<'de, D>(deserializer: D) -> std::result::Result<Option<ValidationReport>, D::Error>
where
    D: Deserializer<'de>,
{
    let report = Option::<ValidationReport>::deserialize(deserializer)?;
    Ok(report.filter(|r| match r {
        ValidationReport::Scored(scores) => !scores.is_empty(),
        ValidationReport::Freeform(text) => !text.trim().is_empty(),
    }))
}

/// A project as known to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Opaque server-assigned identifier
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_report",
        skip_serializing_if = "Option::is_none"
    )]
    pub validation_scores: Option<ValidationReport>,
    #[serde(default)]
    pub task_count: u32,
    #[serde(default)]
    pub completed_tasks: u32,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Percent of tasks done, rounded to one decimal place
    pub fn progress(&self) -> f64 {
        percent(self.completed_tasks, self.task_count)
    }

    /// Overwrite the derived counts from freshly computed task statistics
    pub fn apply_stats(&mut self, stats: &TaskStats) {
        self.task_count = stats.total;
        self.completed_tasks = stats.done;
    }

    pub fn scores(&self) -> Option<&ValidationScores> {
        self.validation_scores.as_ref().and_then(ValidationReport::scores)
    }
}

/// A validated request to create a project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProject {
    pub title: String,
    pub description: String,
}

impl NewProject {
    /// Build a creation request.
    ///
    /// The title must not be blank and the description must hold at least
    /// [`MIN_DESCRIPTION_CHARS`] characters; both are checked before anything
    /// is sent to the backend.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Result<Self> {
        let title = title.into().trim().to_string();
        let description = description.into();

        if title.is_empty() {
            return Err(Error::Validation(
                "Project title must not be empty".to_string(),
            ));
        }

        let length = description.chars().count();
        if length < MIN_DESCRIPTION_CHARS {
            return Err(Error::Validation(format!(
                "Project description must be at least {} characters (got {})",
                MIN_DESCRIPTION_CHARS, length
            )));
        }

        Ok(Self { title, description })
    }
}
