use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Per-user client configuration persisted with the user record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    /// Grouping of the contact list ("normal", "category", "role", "dept")
    #[serde(default)]
    pub contacts_group_by_type: Option<String>,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl UserConfig {
    /// Store a new contact grouping
    pub fn set_contacts_group_by_type(&mut self, value: impl Into<String>) {
        self.contacts_group_by_type = Some(value.into());
        self.touch();
    }

    /// Update the timestamp
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now().to_rfc3339());
    }

    /// Validate settings data
    pub fn validate(&self) -> Result<(), String> {
        if let Some(value) = &self.contacts_group_by_type {
            if value.trim().is_empty() {
                return Err("contactsGroupByType cannot be blank".to_string());
            }
        }

        if let Some(updated_at) = &self.updated_at {
            if chrono::DateTime::parse_from_rfc3339(updated_at).is_err() {
                return Err("Invalid updated_at timestamp format".to_string());
            }
        }

        Ok(())
    }
}
