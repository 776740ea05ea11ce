//! Chats and the membership rules that decide who may post.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::committers::{CommittersType, CommittersValue};
use super::member::{Member, MemberId};
use crate::repositories::MemberDirectory;

/// Represents a chat conversation and its membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    /// Global chat identifier
    pub gid: String,
    /// Chat name
    pub name: String,
    /// Type of chat (one2one, group, system)
    pub chat_type: ChatType,
    /// Creator of the chat
    pub owner: Option<MemberId>,
    /// Members promoted to chat admin
    #[serde(default)]
    pub admins: BTreeSet<MemberId>,
    /// Member ids of the chat
    #[serde(default)]
    pub members: BTreeSet<MemberId>,
    /// Stored committers string, see [`CommittersValue::from_wire`]
    #[serde(default)]
    pub committers: String,
    /// Creation timestamp
    pub created_at: String,
}

/// Chat type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    One2One,
    Group,
    System,
}

impl From<&str> for ChatType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "one2one" => ChatType::One2One,
            "system" => ChatType::System,
            _ => ChatType::Group,
        }
    }
}

impl From<ChatType> for String {
    fn from(chat_type: ChatType) -> Self {
        match chat_type {
            ChatType::One2One => "one2one".to_string(),
            ChatType::Group => "group".to_string(),
            ChatType::System => "system".to_string(),
        }
    }
}

impl Chat {
    /// Create a new chat instance with nobody in it
    pub fn new(gid: impl Into<String>, name: impl Into<String>, chat_type: ChatType) -> Self {
        Self {
            gid: gid.into(),
            name: name.into(),
            chat_type,
            owner: None,
            admins: BTreeSet::new(),
            members: BTreeSet::new(),
            committers: String::new(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Gid of the one-to-one chat between two members
    pub fn one2one_gid(a: MemberId, b: MemberId) -> String {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        format!("{low}&{high}")
    }

    pub fn with_owner(mut self, owner: MemberId) -> Self {
        self.owner = Some(owner);
        self.members.insert(owner);
        self
    }

    pub fn with_members(mut self, members: impl IntoIterator<Item = MemberId>) -> Self {
        self.members.extend(members);
        self
    }

    pub fn with_admins(mut self, admins: impl IntoIterator<Item = MemberId>) -> Self {
        self.admins.extend(admins);
        self
    }

    pub fn with_committers(mut self, committers: impl Into<String>) -> Self {
        self.committers = committers.into();
        self
    }

    /// Check if this is a group chat
    pub fn is_group(&self) -> bool {
        matches!(self.chat_type, ChatType::Group)
    }

    /// Parsed committers value
    pub fn committers_value(&self) -> CommittersValue {
        CommittersValue::from_wire(&self.committers)
    }

    /// Committer mode derived from the stored committers string
    pub fn committers_type(&self) -> CommittersType {
        self.committers_value().committers_type()
    }

    /// Stored whitelist, only present in whitelist mode
    pub fn whitelist(&self) -> Option<BTreeSet<MemberId>> {
        match self.committers_value() {
            CommittersValue::Whitelist(ids) => Some(ids),
            _ => None,
        }
    }

    /// Replace the stored committers with a new policy value
    pub fn set_committers(&mut self, value: &CommittersValue) {
        self.committers = value.to_wire();
    }

    /// Admin predicate: super admins, the owner and promoted admins
    pub fn is_admin(&self, member: &Member) -> bool {
        member.is_super_admin
            || self.owner == Some(member.id)
            || self.admins.contains(&member.id)
    }

    /// Check if a member id belongs to this chat
    pub fn is_member(&self, member_id: MemberId) -> bool {
        self.members.contains(&member_id)
    }

    /// Resolve member ids against the directory. Ids the directory does not
    /// know are skipped.
    pub fn members_set(&self, directory: &dyn MemberDirectory) -> Vec<Member> {
        self.members
            .iter()
            .filter_map(|id| directory.member(*id))
            .collect()
    }

    /// Whether `member` may currently post, using live admin status
    pub fn is_committer(&self, member: &Member) -> bool {
        if !self.is_member(member.id) {
            return false;
        }
        match self.committers_value() {
            CommittersValue::All => true,
            CommittersValue::Admins => self.is_admin(member),
            CommittersValue::Whitelist(ids) => ids.contains(&member.id),
        }
    }

    /// Validate chat data
    pub fn validate(&self) -> Result<(), String> {
        if self.gid.trim().is_empty() {
            return Err("Chat gid cannot be empty".to_string());
        }

        if let Some(owner) = self.owner {
            if !self.members.contains(&owner) {
                return Err("Chat owner must be a member".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryDirectory;

    fn team_chat() -> Chat {
        Chat::new("g1", "Team", ChatType::Group)
            .with_owner(1)
            .with_members([2, 3, 4])
            .with_admins([2])
    }

    #[test]
    fn test_chat_creation() {
        let chat = team_chat();
        assert!(chat.is_group());
        assert_eq!(chat.members.len(), 4);
        assert!(chat.is_member(1));
        assert!(!chat.is_member(9));
        assert!(chat.validate().is_ok());
        assert_eq!(chat.committers_type(), CommittersType::All);
    }

    #[test]
    fn test_one2one_gid_is_symmetric() {
        assert_eq!(Chat::one2one_gid(3, 10), "3&10");
        assert_eq!(Chat::one2one_gid(10, 3), "3&10");
    }

    #[test]
    fn test_admin_predicate() {
        let chat = team_chat();
        assert!(chat.is_admin(&Member::new(1, "owner")));
        assert!(chat.is_admin(&Member::new(2, "admin")));
        assert!(!chat.is_admin(&Member::new(3, "plain")));
        assert!(chat.is_admin(&Member::new(3, "plain").as_super_admin()));
    }

    #[test]
    fn test_committers_derivation() {
        let chat = team_chat().with_committers("$ADMINS");
        assert_eq!(chat.committers_type(), CommittersType::Admins);
        assert!(chat.whitelist().is_none());

        let chat = team_chat().with_committers("3,4");
        assert_eq!(chat.committers_type(), CommittersType::Whitelist);
        assert_eq!(chat.whitelist(), Some([3, 4].into_iter().collect()));
    }

    #[test]
    fn test_is_committer_uses_live_admin_status() {
        let mut chat = team_chat().with_committers("$ADMINS");
        let plain = Member::new(3, "plain");
        assert!(!chat.is_committer(&plain));

        chat.admins.insert(3);
        assert!(chat.is_committer(&plain));

        assert!(!chat.is_committer(&Member::new(99, "stranger")));
    }

    #[test]
    fn test_set_committers_roundtrips_mode() {
        let mut chat = team_chat();
        chat.set_committers(&CommittersValue::Whitelist([4].into_iter().collect()));
        assert_eq!(chat.committers, "4");
        assert!(chat.is_committer(&Member::new(4, "d")));
        assert!(!chat.is_committer(&Member::new(3, "c")));
    }

    #[test]
    fn test_members_set_skips_unknown_ids() {
        let directory = InMemoryDirectory::new();
        directory.upsert_member(Member::new(1, "a"));
        directory.upsert_member(Member::new(3, "c"));

        let members = team_chat().members_set(&directory);
        let ids: Vec<_> = members.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_validation() {
        let mut chat = team_chat();
        chat.members.remove(&1);
        assert!(chat.validate().is_err());

        let chat = Chat::new(" ", "Empty", ChatType::Group);
        assert!(chat.validate().is_err());
    }
}
