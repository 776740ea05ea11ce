//! Business logic services for the user management system.

pub mod preferences;
pub mod session_service;

// Re-export all services
pub use preferences::PreferenceStore;
pub use session_service::UserSession;
