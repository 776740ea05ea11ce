//! Error types for the chat system.

use thiserror::Error;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat system
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChatError {
    #[error("Member not found: {id}")]
    MemberNotFound { id: i64 },

    #[error("Directory unavailable: {reason}")]
    DirectoryUnavailable { reason: String },

    #[error("Invalid group type: {value}")]
    InvalidGroupType { value: String },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl ChatError {
    /// Create a not found error for members
    pub fn member_not_found(id: i64) -> Self {
        Self::MemberNotFound { id }
    }

    /// Create a directory unavailable error
    pub fn directory_unavailable(reason: impl Into<String>) -> Self {
        Self::DirectoryUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an invalid group type error
    pub fn invalid_group_type(value: impl Into<String>) -> Self {
        Self::InvalidGroupType {
            value: value.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
