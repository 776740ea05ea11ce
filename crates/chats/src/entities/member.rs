use serde::{Deserialize, Serialize};

/// Identifier of a member in the directory
pub type MemberId = i64;

/// A member as known to the directory. Read-only from the point of view of
/// chats and views; the directory owns mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    /// Directory identifier
    pub id: MemberId,
    /// Login account
    pub account: String,
    /// Display name (optional, falls back to account)
    pub display_name: Option<String>,
    /// Role code, e.g. "dev" or "pm"
    pub role: Option<String>,
    /// Department the member belongs to
    pub dept: Option<i64>,
    /// Site-wide administrator
    #[serde(default)]
    pub is_super_admin: bool,
    /// Presence status
    pub status: MemberStatus,
}

/// Member presence status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Unverified,
    #[default]
    Offline,
    Online,
    Busy,
    Away,
}

impl From<&str> for MemberStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "online" => MemberStatus::Online,
            "busy" => MemberStatus::Busy,
            "away" => MemberStatus::Away,
            "unverified" => MemberStatus::Unverified,
            _ => MemberStatus::Offline,
        }
    }
}

impl From<MemberStatus> for String {
    fn from(status: MemberStatus) -> Self {
        status.as_str().to_string()
    }
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Unverified => "unverified",
            MemberStatus::Offline => "offline",
            MemberStatus::Online => "online",
            MemberStatus::Busy => "busy",
            MemberStatus::Away => "away",
        }
    }

    /// Busy and away members are still connected
    pub fn is_online(&self) -> bool {
        matches!(
            self,
            MemberStatus::Online | MemberStatus::Busy | MemberStatus::Away
        )
    }
}

impl Member {
    /// Create a new offline member
    pub fn new(id: MemberId, account: impl Into<String>) -> Self {
        Self {
            id,
            account: account.into(),
            display_name: None,
            role: None,
            dept: None,
            is_super_admin: false,
            status: MemberStatus::Offline,
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

    pub fn with_dept(mut self, dept: i64) -> Self {
        self.dept = Some(dept);
        self
    }

    pub fn with_status(mut self, status: MemberStatus) -> Self {
        self.status = status;
        self
    }

    pub fn as_super_admin(mut self) -> Self {
        self.is_super_admin = true;
        self
    }

    /// Name shown in lists
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.account,
        }
    }

    /// Check if the member is currently connected
    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }
}
