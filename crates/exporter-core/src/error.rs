//! Error types for export operations.

use crate::status::Status;
use thiserror::Error;

/// Failures reported by the hosting services and the version-control driver.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Failed to authenticate with a hosting service.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Requested resource does not exist.
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiError(String),

    /// Network error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A git subprocess exited unsuccessfully.
    #[error("Git command failed: {0}")]
    GitCommandFailed(String),

    /// Malformed URL returned by or built for a hosting service.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for RemoteError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkError(err.to_string())
    }
}

impl From<url::ParseError> for RemoteError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

/// Result type for collaborator calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Failures of export tasks.
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// The source lookup returned no project with the requested name.
    #[error("No project found for '{0}'")]
    NoSourceProject(String),

    /// The source lookup returned more than one project with the requested name.
    #[error("Multiple projects ({count}) found for '{name}'")]
    MultipleSourceProjects { name: String, count: usize },

    /// The task was stopped and noticed it at a checkpoint.
    #[error("Task '{0}' was interrupted")]
    Interrupted(String),

    /// A hosting-service or git call failed.
    #[error("Task '{task}' failed: {source}")]
    Task {
        task: String,
        #[source]
        source: RemoteError,
    },

    /// Compensating a task's destination-side changes failed.
    #[error("Rollback of '{task}' failed: {source}")]
    Rollback {
        task: String,
        #[source]
        source: RemoteError,
    },

    /// A worker terminated abnormally.
    #[error("Worker for '{task}' terminated abnormally: {message}")]
    WorkerPanicked { task: String, message: String },

    /// The shared temporary directory could not be prepared.
    #[error("Cannot prepare working directory '{path}': {message}")]
    WorkDir { path: String, message: String },
}

impl ExportError {
    /// Check if this error represents cooperative cancellation.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }

    /// Status marker this failure contributes to the owning task, if any.
    pub fn status_marker(&self) -> Option<Status> {
        match self {
            Self::NoSourceProject(_) => Some(Status::NoSourceProject),
            Self::MultipleSourceProjects { .. } => Some(Status::MultipleSourceProjects),
            Self::Interrupted(_) => Some(Status::Interrupted),
            Self::Rollback { .. } => Some(Status::RollbackedError),
            _ => None,
        }
    }
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Configuration and project-list errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be read or parsed.
    #[error("Failed to load the configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The configuration was parsed but is incomplete.
    #[error("{0}")]
    Invalid(String),

    /// The project list is malformed.
    #[error("{0}")]
    ProjectList(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_markers() {
        assert_eq!(
            ExportError::NoSourceProject("a".into()).status_marker(),
            Some(Status::NoSourceProject)
        );
        assert_eq!(
            ExportError::MultipleSourceProjects {
                name: "a".into(),
                count: 2
            }
            .status_marker(),
            Some(Status::MultipleSourceProjects)
        );
        let task_error = ExportError::Task {
            task: "a->b".into(),
            source: RemoteError::ApiError("boom".into()),
        };
        assert_eq!(task_error.status_marker(), None);
        assert!(!task_error.is_interrupted());
        assert!(ExportError::Interrupted("a->b".into()).is_interrupted());
    }

    #[test]
    fn test_error_messages() {
        let err = ExportError::Task {
            task: "a->b".into(),
            source: RemoteError::GitCommandFailed("exit 128".into()),
        };
        assert_eq!(
            err.to_string(),
            "Task 'a->b' failed: Git command failed: exit 128"
        );
    }
}
