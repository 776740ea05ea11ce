//! # Rollcall Users Crate
//!
//! The signed-in user of a Rollcall client and the preferences persisted
//! with their record.
//!
//! ## Architecture
//!
//! - **Entities**: Domain models (User, UserConfig)
//! - **Services**: The preference store trait and an in-memory session
//! - **Types**: Shared error types
//!
//! ## Usage
//!
//! ```rust
//! use rollcall_users::{PreferenceStore, User, UserSession};
//!
//! let session = UserSession::new();
//! assert!(session.contacts_group_by_type().is_none());
//!
//! session.sign_in(User::new(1, "alice"));
//! session.set_contacts_group_by_type("role").unwrap();
//! assert_eq!(session.contacts_group_by_type().as_deref(), Some("role"));
//! ```

pub mod entities;
pub mod services;
pub mod types;

// Re-export main types for convenience
pub use entities::{User, UserConfig};
pub use services::{PreferenceStore, UserSession};
pub use types::{UserError, UserId, UserResult};
