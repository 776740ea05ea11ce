//! Shared types for the user management system.

pub mod errors;

// Re-export common types
pub use errors::{UserError, UserResult};

// Common type aliases
pub type UserId = i64;
