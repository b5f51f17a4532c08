//! Error types for the cf-app service layer.

use std::path::PathBuf;

use cf_project::{ProjectError, ValidationError};
use cf_results::ResultsError;

use crate::backend::BackendError;
use crate::task::TaskState;

/// Application error type that wraps errors from the backend crates and
/// provides one error interface for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Request validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed configuration file, missing: {}", missing.join(", "))]
    MalformedConfigurationFile { missing: Vec<String> },

    #[error("Strategy error: {0}")]
    Strategy(String),

    #[error("Project error: {0}")]
    Project(String),

    #[error("Result shape mismatch: {0}")]
    ResultShapeMismatch(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Invalid task transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("No active task")]
    NoActiveTask,

    #[error("Result not available, task is {state}")]
    ResultNotReady { state: TaskState },

    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Poll schedule error: {0}")]
    Schedule(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<ProjectError> for AppError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::MalformedConfigurationFile { missing } => {
                AppError::MalformedConfigurationFile { missing }
            }
            ProjectError::Strategy(e) => AppError::Strategy(e.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<ResultsError> for AppError {
    fn from(err: ResultsError) -> Self {
        match err {
            e @ ResultsError::ResultShapeMismatch { .. } => {
                AppError::ResultShapeMismatch(e.to_string())
            }
            other => AppError::Results(other.to_string()),
        }
    }
}

impl From<cf_core::CoreError> for AppError {
    fn from(err: cf_core::CoreError) -> Self {
        AppError::Strategy(err.to_string())
    }
}
