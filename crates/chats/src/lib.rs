//! # Rollcall Chats Crate
//!
//! Membership-facing core of Rollcall: members and chats as seen through
//! the directory, the committer policy edit session, and the change-event
//! bus that live views subscribe to.
//!
//! ## Architecture
//!
//! - **Entities**: Domain models (Member, Chat, CommittersValue, Group tree)
//! - **Services**: Edit sessions over the entities (CommitterPolicyModel)
//! - **Repositories**: The directory trait and an in-memory directory
//! - **Types**: Errors and change events
//!
//! ## Usage
//!
//! ```rust
//! use rollcall_chats::{Chat, ChatType, CommitterPolicyModel, CommittersValue, InMemoryDirectory, Member};
//!
//! let directory = InMemoryDirectory::new();
//! directory.upsert_member(Member::new(1, "alice"));
//! directory.upsert_member(Member::new(2, "bob"));
//!
//! let chat = Chat::new("g1", "Team", ChatType::Group)
//!     .with_owner(1)
//!     .with_members([2])
//!     .with_committers(",");
//!
//! let model = CommitterPolicyModel::new(&chat, &directory);
//! assert_eq!(model.get_committers(), CommittersValue::Whitelist([1].into_iter().collect()));
//! ```

pub mod entities;
pub mod repositories;
pub mod services;
pub mod types;

// Re-export main types for convenience
pub use entities::{
    Chat, ChatType, CommittersType, CommittersValue, ContactEntry, Group, GroupNode, GroupType,
    Member, MemberId, MemberStatus,
};
pub use repositories::{ActiveChatQuery, Department, InMemoryDirectory, MemberDirectory};
pub use services::{CommitterPolicyModel, WhitelistCandidate};
pub use types::{ChatError, ChatEvent, ChatResult, EventBus, EventEnvelope, Subscription, SubscriptionId};
