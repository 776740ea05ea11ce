//! # Rollcall Contacts Crate
//!
//! View model of the grouped contact list. The directory decides how
//! contacts are partitioned; this crate picks the grouping, works out which
//! groups start expanded and which are shown, and keeps the result in step
//! with the directory's change events.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rollcall_chats::{EventBus, GroupType, InMemoryDirectory, Member};
//! use rollcall_contacts::{ContactGroupView, ViewDependencies};
//! use rollcall_users::UserSession;
//!
//! let bus = EventBus::new();
//! let directory = Arc::new(InMemoryDirectory::with_bus(bus.clone()));
//! let deps = ViewDependencies {
//!     directory: directory.clone(),
//!     active_chat: directory.clone(),
//!     preferences: Arc::new(UserSession::new()),
//!     bus,
//! };
//!
//! let mut view = ContactGroupView::new(deps, GroupType::Normal);
//! view.mount().unwrap();
//!
//! directory.upsert_member(Member::new(2, "bob"));
//! assert_eq!(view.model().unwrap().contact_count(), 1);
//! ```

pub mod grouping;
pub mod view;

pub use grouping::{default_expand, derive_nodes, resolve_group_type, RenderedGroup, RenderedNode};
pub use view::{
    ContactGroupView, ContactListModel, GroupTypeMenuItem, MeRow, ViewDependencies, ViewLifecycle,
};
