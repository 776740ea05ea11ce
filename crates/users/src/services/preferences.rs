//! Access to the signed-in user's persisted preferences.

use crate::entities::User;
use crate::types::UserResult;

/// Preference store seen by client views.
///
/// Having nobody signed in is a normal state: reads return `None`, writes
/// fail with [`UserError::NotAuthenticated`](crate::types::UserError).
pub trait PreferenceStore: Send + Sync {
    /// The signed-in user, if any
    fn current_user(&self) -> Option<User>;

    /// Persisted contact grouping of the signed-in user
    fn contacts_group_by_type(&self) -> Option<String> {
        self.current_user()
            .and_then(|user| user.config.contacts_group_by_type)
    }

    /// Persist the contact grouping for the signed-in user
    fn set_contacts_group_by_type(&self, value: &str) -> UserResult<()>;
}
