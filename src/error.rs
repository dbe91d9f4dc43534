//! Error taxonomy for the store, repository and cache layers.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of the durable key-value layer (I/O or (de)serialization).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StorageError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message followed by the underlying cause, if any.
    pub fn describe(&self) -> String {
        match self.source {
            Some(ref source) => format!("{}: {}", self.message, source),
            None => self.message.clone(),
        }
    }
}

/// A field failed its schema check at the input boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors surfaced by repository reads/writes and optimistic mutations.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to fetch tasks: {}", .0.describe())]
    Fetch(#[source] StorageError),

    #[error("failed to create task: {}", .0.describe())]
    Create(#[source] StorageError),

    #[error("failed to update task: {}", .0.describe())]
    Update(#[source] StorageError),

    #[error("failed to delete task: {}", .0.describe())]
    Delete(#[source] StorageError),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("invalid {}: {}", .0.field, .0.message)]
    Validation(#[from] ValidationError),

    #[error("refresh of {0} was cancelled")]
    Cancelled(String),
}

impl TaskError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TaskError::Fetch(_) => ErrorCode::FetchFailed,
            TaskError::Create(_) => ErrorCode::CreateFailed,
            TaskError::Update(_) => ErrorCode::UpdateFailed,
            TaskError::Delete(_) => ErrorCode::DeleteFailed,
            TaskError::NotFound(_) => ErrorCode::TaskNotFound,
            TaskError::Validation(_) => ErrorCode::InvalidFieldValue,
            TaskError::Cancelled(_) => ErrorCode::Cancelled,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::NotFound(_))
    }
}

pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,

    // Storage errors
    FetchFailed,
    CreateFailed,
    UpdateFailed,
    DeleteFailed,

    // Session errors
    Unauthorized,

    Cancelled,
    InternalError,
}

/// Structured error for machine-readable output.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn unauthorized() -> Self {
        Self::new(
            ErrorCode::Unauthorized,
            "Session is not authorized to modify tasks",
        )
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl From<&TaskError> for ErrorReport {
    fn from(err: &TaskError) -> Self {
        let report = ErrorReport::new(err.code(), err.to_string());
        match err {
            TaskError::Validation(v) => report.with_field(v.field),
            _ => report,
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ErrorReport {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ErrorReport {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<TaskError>() {
            Ok(task_err) => ErrorReport::from(&task_err),
            Err(err) => match err.downcast::<ErrorReport>() {
                Ok(report) => report,
                Err(err) => ErrorReport::internal(err),
            },
        }
    }
}
