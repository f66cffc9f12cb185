use thiserror::Error;

/// Error taxonomy shared by every core operation.
///
/// Validation and conflict errors carry enough context to render a user
/// message; they are never retried automatically.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity absent, or present but outside the caller's tenant scope.
    #[error("not found: {0}")]
    NotFound(String),
    /// Duplicate code, already-generated payroll, double-processing attempt.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Operation that is structurally impossible, e.g. posting a macro bill
    /// or deactivating a center that still has children.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// Missing or malformed input, rejected before any state changes.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        CoreError::Conflict(what.into())
    }

    pub fn invalid_op(what: impl Into<String>) -> Self {
        CoreError::InvalidOperation(what.into())
    }

    pub fn validation(what: impl Into<String>) -> Self {
        CoreError::Validation(what.into())
    }
}
