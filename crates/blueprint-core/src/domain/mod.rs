//! Domain layer
//!
//! Entities, the session cache that owns them, the pure views derived from
//! them, and the optimistic status transition protocol.

pub mod filter;
pub mod progress;
pub mod project;
pub mod store;
pub mod task;
pub mod timestamp;
pub mod transition;

pub use filter::{ProjectFilter, ProjectStatusFilter, TaskFilter, TaskStatusFilter};
pub use progress::{DashboardSummary, TaskStats};
pub use project::{
    MIN_DESCRIPTION_CHARS, NewProject, Project, ProjectStatus, ValidationReport, ValidationScores,
};
pub use store::{EntityStore, StoreEvent};
pub use task::{NewTask, Task, TaskPriority, TaskStatus};
pub use transition::StatusTransitionHandler;
