//! Error types for Blueprint

use thiserror::Error;

/// Result type alias using Blueprint's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Blueprint error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors (E001-E099)
    #[error("Validation failed: {0}")]
    Validation(String),

    // Auth errors (E100-E199)
    #[error("Unauthorized: {0}. Run `blueprint login` to start a new session.")]
    Unauthorized(String),

    #[error("Not logged in. Run `blueprint login` or set BLUEPRINT_TOKEN.")]
    NotAuthenticated,

    // Not found errors (E200-E299)
    #[error("Project '{0}' not found. Run `blueprint projects list` to see all projects.")]
    ProjectNotFound(String),

    #[error("Task '{0}' not found. Run `blueprint tasks list <project>` to see its tasks.")]
    TaskNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // Network errors (E300-E399)
    #[error("Network error: {0}. Check that the Blueprint API is reachable.")]
    NetworkError(#[from] reqwest::Error),

    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    // Concurrency errors (E400-E499)
    #[error("Task '{0}' already has a status change in flight. Wait for it to finish.")]
    TransitionInFlight(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E001",
            Self::Unauthorized(_) => "E100",
            Self::NotAuthenticated => "E101",
            Self::ProjectNotFound(_) => "E200",
            Self::TaskNotFound(_) => "E201",
            Self::NotFound(_) => "E202",
            Self::NetworkError(_) => "E300",
            Self::ServerError { .. } => "E301",
            Self::InvalidResponse(_) => "E302",
            Self::TransitionInFlight(_) => "E400",
            Self::ConfigError(_) => "E600",
            Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Unauthorized(_) | Self::NotAuthenticated => Some("blueprint login".to_string()),
            Self::ProjectNotFound(_) => Some("blueprint projects list".to_string()),
            Self::TaskNotFound(_) => Some("blueprint tasks list <project-id>".to_string()),
            Self::NetworkError(_) => Some("blueprint config get api.base_url".to_string()),
            Self::ConfigError(_) => Some("blueprint config list".to_string()),
            _ => None,
        }
    }

    /// Whether the failed operation can be attempted again without user action.
    ///
    /// Nothing retries automatically; this only tells the caller that cached
    /// state was preserved and the same request may succeed later.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_)
                | Self::ServerError { .. }
                | Self::InvalidResponse(_)
                | Self::TransitionInFlight(_)
        )
    }

    /// Credential rejected or missing; the session must end.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::NotAuthenticated)
    }

    /// The referenced entity no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound(_) | Self::TaskNotFound(_) | Self::NotFound(_)
        )
    }
}
