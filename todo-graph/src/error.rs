use crate::task::TaskId;

/// Error type for task store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// Malformed or missing input: empty title, unknown priority, bad id.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The operation targeted a task that does not exist.
    #[error("Task with ID {0} not found")]
    NotFound(TaskId),
    /// The backing store failed. Only persistent backends produce this.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TaskError {
    pub fn validation(message: impl Into<String>) -> Self {
        TaskError::Validation(message.into())
    }
}
