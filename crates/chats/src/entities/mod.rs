//! Domain entities for the chat system.
//!
//! Members and chats as read from the directory, the committer policy
//! value stored on a chat, and the group tree used by the contact list.

pub mod chat;
pub mod committers;
pub mod group;
pub mod member;

// Re-export all entity types
pub use chat::{Chat, ChatType};
pub use committers::{CommittersType, CommittersValue, COMMITTERS_ADMINS, COMMITTERS_ALL};
pub use group::{ContactEntry, Group, GroupNode, GroupType};
pub use member::{Member, MemberId, MemberStatus};
