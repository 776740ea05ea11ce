//! Domain entities for the user management system.

pub mod settings;
pub mod user;

// Re-export all entity types
pub use settings::UserConfig;
pub use user::User;
