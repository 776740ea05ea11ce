use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::settings::UserConfig;

/// The signed-in user of this client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Directory member id of the user
    pub id: i64,
    /// Login account
    pub account: String,
    /// Display name for the user
    pub display_name: Option<String>,
    /// Role code, shown as a label next to the name
    pub role: Option<String>,
    /// Persisted client configuration
    #[serde(default)]
    pub config: UserConfig,
    /// Last login timestamp
    pub last_login_at: Option<String>,
}

impl User {
    /// Create a new user instance
    pub fn new(id: i64, account: impl Into<String>) -> Self {
        Self {
            id,
            account: account.into(),
            display_name: None,
            role: None,
            config: UserConfig::default(),
            last_login_at: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_config(mut self, config: UserConfig) -> Self {
        self.config = config;
        self
    }

    /// Name shown in the "me" row
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.account)
    }

    /// Record a login
    pub fn mark_login(&mut self) {
        self.last_login_at = Some(Utc::now().to_rfc3339());
    }

    /// Validate user data
    pub fn validate(&self) -> Result<(), String> {
        if self.id <= 0 {
            return Err("Invalid user ID".to_string());
        }

        if self.account.trim().is_empty() {
            return Err("Account cannot be empty".to_string());
        }

        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new(1, "alice").with_role("dev");
        assert_eq!(user.display_name(), "alice");
        assert_eq!(user.role.as_deref(), Some("dev"));
        assert!(user.validate().is_ok());

        let user = user.with_display_name("Alice");
        assert_eq!(user.display_name(), "Alice");
    }

    #[test]
    fn test_mark_login() {
        let mut user = User::new(1, "alice");
        assert!(user.last_login_at.is_none());
        user.mark_login();
        assert!(user.last_login_at.is_some());
    }

    #[test]
    fn test_user_validation() {
        assert!(User::new(0, "alice").validate().is_err());
        assert!(User::new(1, " ").validate().is_err());
    }
}
