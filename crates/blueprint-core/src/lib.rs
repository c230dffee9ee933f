//! Blueprint Core Library
//!
//! This crate provides the client-side core of Blueprint, a SaaS idea
//! validator and execution tracker:
//! - Domain model (projects, tasks, validation scores)
//! - Entity store with change notifications
//! - Progress calculation and task/project filtering
//! - Optimistic task status transitions with rollback
//! - Remote sync over the Blueprint HTTP API
//! - Configuration and error handling

pub mod config;
pub mod domain;
pub mod error;
pub mod remote;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::{
        EntityStore, NewProject, NewTask, Project, ProjectFilter, Task, TaskFilter, TaskPriority,
        TaskStatus,
    };
    pub use crate::error::{Error, Result};
    pub use crate::remote::{HttpRemoteClient, RemoteSync, Session};
    pub use crate::workspace::Workspace;
}
