//! Error types for the user management system.

use thiserror::Error;

/// Result type alias for user operations
pub type UserResult<T> = Result<T, UserError>;

/// User-related errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserError {
    #[error("No user is signed in")]
    NotAuthenticated,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid settings data: {0}")]
    InvalidSettingsData(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}
