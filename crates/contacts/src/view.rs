//! Live contact list bound to the directory's change events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use rollcall_chats::{
    ActiveChatQuery, ChatError, ChatResult, EventBus, EventEnvelope, GroupType, MemberDirectory,
    Subscription,
};
use rollcall_users::{PreferenceStore, User};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::grouping::{derive_nodes, resolve_group_type, RenderedGroup, RenderedNode};

/// Collaborators a contact view reads from
#[derive(Clone)]
pub struct ViewDependencies {
    pub directory: Arc<dyn MemberDirectory>,
    pub active_chat: Arc<dyn ActiveChatQuery>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub bus: EventBus,
}

/// Lifecycle of a [`ContactGroupView`]. `Unsubscribed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewLifecycle {
    Uninitialized,
    Subscribed,
    Unsubscribed,
}

/// The signed-in user's own row, which carries the grouping menu
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeRow {
    pub user_id: i64,
    pub display_name: String,
    pub role: Option<String>,
}

impl From<User> for MeRow {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            display_name: user.display_name().to_string(),
            role: user.role,
        }
    }
}

/// One choice of the grouping menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTypeMenuItem {
    pub group_type: GroupType,
    pub checked: bool,
}

/// Everything the list renderer needs for one frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactListModel {
    pub group_type: GroupType,
    pub me: Option<MeRow>,
    pub hide_empty_groups: bool,
    pub nodes: Vec<RenderedNode>,
    /// Increments with every successful derivation
    pub revision: u64,
}

impl ContactListModel {
    /// Top-level groups
    pub fn groups(&self) -> impl Iterator<Item = &RenderedGroup> {
        self.nodes.iter().filter_map(RenderedNode::as_group)
    }

    /// Find a group anywhere in the tree
    pub fn find_group(&self, id: &str) -> Option<&RenderedGroup> {
        self.groups().find_map(|group| group.find(id))
    }

    /// Number of contact rows at any depth
    pub fn contact_count(&self) -> usize {
        fn count(nodes: &[RenderedNode]) -> usize {
            nodes
                .iter()
                .map(|node| match node {
                    RenderedNode::Entry(_) => 1,
                    RenderedNode::Group(group) => count(&group.list),
                })
                .sum()
        }
        count(&self.nodes)
    }
}

struct ViewShared {
    deps: ViewDependencies,
    default_group_type: GroupType,
    session_group_type: RwLock<Option<GroupType>>,
    lifecycle: RwLock<ViewLifecycle>,
    model: RwLock<Option<ContactListModel>>,
    revision: AtomicU64,
}

impl ViewShared {
    fn lifecycle(&self) -> ViewLifecycle {
        *self
            .lifecycle
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_lifecycle(&self, lifecycle: ViewLifecycle) {
        *self
            .lifecycle
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = lifecycle;
    }

    fn session_group_type(&self) -> Option<GroupType> {
        *self
            .session_group_type
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn group_type(&self) -> GroupType {
        resolve_group_type(
            self.session_group_type(),
            self.deps.preferences.contacts_group_by_type().as_deref(),
            self.default_group_type,
        )
    }

    /// Rebuild the model from scratch. On failure the previous model stays.
    fn rederive(&self, trigger: &str) -> ChatResult<()> {
        if self.lifecycle() != ViewLifecycle::Subscribed {
            return Err(ChatError::invalid_state("contact view is not mounted"));
        }

        let group_type = self.group_type();
        let nodes = self
            .deps
            .directory
            .contact_groups(group_type)
            .map_err(|err| {
                warn!(%err, trigger, %group_type, "contact list not refreshed, keeping previous state");
                err
            })?;

        let nodes = derive_nodes(nodes, group_type, self.deps.active_chat.as_ref());
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let model = ContactListModel {
            group_type,
            me: self.deps.preferences.current_user().map(MeRow::from),
            hide_empty_groups: !group_type.shows_empty_groups(),
            nodes,
            revision,
        };

        debug!(trigger, %group_type, revision, rows = model.nodes.len(), "contact list derived");
        *self
            .model
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(model);
        Ok(())
    }
}

/// Grouped, live contact list.
///
/// Mounting subscribes to the data-change bus and derives the first model;
/// every later event re-derives everything. Unmounting (or dropping the
/// view) releases the subscription for good.
pub struct ContactGroupView {
    shared: Arc<ViewShared>,
    subscription: Option<Subscription>,
}

impl ContactGroupView {
    pub fn new(deps: ViewDependencies, default_group_type: GroupType) -> Self {
        Self {
            shared: Arc::new(ViewShared {
                deps,
                default_group_type,
                session_group_type: RwLock::new(None),
                lifecycle: RwLock::new(ViewLifecycle::Uninitialized),
                model: RwLock::new(None),
                revision: AtomicU64::new(0),
            }),
            subscription: None,
        }
    }

    pub fn lifecycle(&self) -> ViewLifecycle {
        self.shared.lifecycle()
    }

    /// Subscribe and derive the first model. Only valid once.
    ///
    /// A failing first derivation leaves the view subscribed with no model;
    /// the next event fills it in.
    pub fn mount(&mut self) -> ChatResult<()> {
        match self.lifecycle() {
            ViewLifecycle::Uninitialized => {}
            ViewLifecycle::Subscribed => {
                return Err(ChatError::invalid_state("contact view already mounted"))
            }
            ViewLifecycle::Unsubscribed => {
                return Err(ChatError::invalid_state("contact view was unmounted"))
            }
        }

        let weak: Weak<ViewShared> = Arc::downgrade(&self.shared);
        let subscription = self
            .shared
            .deps
            .bus
            .on_data_change(move |envelope: &EventEnvelope| {
                if let Some(shared) = weak.upgrade() {
                    // failures are logged and leave the last model in place
                    let _ = shared.rederive(envelope.event.event_type_name());
                }
            });

        self.subscription = Some(subscription);
        self.shared.set_lifecycle(ViewLifecycle::Subscribed);
        debug!("contact view mounted");

        if let Err(err) = self.shared.rederive("mount") {
            debug!(%err, "initial contact list derivation deferred");
        }
        Ok(())
    }

    /// Release the subscription. Nothing is derived afterwards.
    pub fn unmount(&mut self) {
        if self.lifecycle() == ViewLifecycle::Unsubscribed {
            return;
        }
        self.shared.set_lifecycle(ViewLifecycle::Unsubscribed);
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            debug!("contact view unmounted");
        }
    }

    /// Effective grouping, resolved fresh on every call
    pub fn group_type(&self) -> GroupType {
        self.shared.group_type()
    }

    /// Grouping chosen in this session, if any
    pub fn session_group_type(&self) -> Option<GroupType> {
        self.shared.session_group_type()
    }

    /// Switch grouping for this session and, when someone is signed in,
    /// save it to their preferences. Saving is best effort.
    pub fn set_group_type(&self, group_type: GroupType) {
        *self
            .shared
            .session_group_type
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(group_type);

        if self.lifecycle() == ViewLifecycle::Subscribed {
            let _ = self.shared.rederive("group_type_changed");
        }

        let preferences = &self.shared.deps.preferences;
        if preferences.current_user().is_some() {
            if let Err(err) = preferences.set_contacts_group_by_type(group_type.as_str()) {
                warn!(%err, %group_type, "failed to persist contact grouping");
            }
        }
    }

    /// Grouping menu with the current choice checked
    pub fn group_type_menu(&self) -> Vec<GroupTypeMenuItem> {
        let current = self.group_type();
        GroupType::all()
            .into_iter()
            .map(|group_type| GroupTypeMenuItem {
                group_type,
                checked: group_type == current,
            })
            .collect()
    }

    /// Re-derive now instead of waiting for an event
    pub fn refresh(&self) -> ChatResult<()> {
        self.shared.rederive("refresh")
    }

    /// Last successfully derived model
    pub fn model(&self) -> Option<ContactListModel> {
        self.shared
            .model
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Drop for ContactGroupView {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for ContactGroupView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactGroupView")
            .field("lifecycle", &self.lifecycle())
            .field("session_group_type", &self.session_group_type())
            .field("default_group_type", &self.shared.default_group_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_chats::{InMemoryDirectory, Member};
    use rollcall_users::UserSession;

    fn view_over(directory: Arc<InMemoryDirectory>, bus: EventBus) -> ContactGroupView {
        let deps = ViewDependencies {
            directory: directory.clone(),
            active_chat: directory,
            preferences: Arc::new(UserSession::new()),
            bus,
        };
        ContactGroupView::new(deps, GroupType::Normal)
    }

    #[test]
    fn test_lifecycle_transitions() {
        let bus = EventBus::new();
        let directory = Arc::new(InMemoryDirectory::with_bus(bus.clone()));
        let mut view = view_over(directory, bus.clone());

        assert_eq!(view.lifecycle(), ViewLifecycle::Uninitialized);
        assert!(view.model().is_none());
        assert!(view.refresh().is_err());

        view.mount().unwrap();
        assert_eq!(view.lifecycle(), ViewLifecycle::Subscribed);
        assert_eq!(bus.subscriber_count(), 1);
        assert!(view.mount().is_err());

        view.unmount();
        assert_eq!(view.lifecycle(), ViewLifecycle::Unsubscribed);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(view.mount().is_err());
        view.unmount();
    }

    #[test]
    fn test_drop_releases_subscription() {
        let bus = EventBus::new();
        let directory = Arc::new(InMemoryDirectory::with_bus(bus.clone()));
        {
            let mut view = view_over(directory.clone(), bus.clone());
            view.mount().unwrap();
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
        directory.upsert_member(Member::new(1, "late"));
    }

    #[test]
    fn test_menu_marks_current_choice() {
        let bus = EventBus::new();
        let directory = Arc::new(InMemoryDirectory::with_bus(bus.clone()));
        let view = view_over(directory, bus);

        let checked: Vec<_> = view
            .group_type_menu()
            .into_iter()
            .filter(|item| item.checked)
            .map(|item| item.group_type)
            .collect();
        assert_eq!(checked, vec![GroupType::Normal]);

        view.set_group_type(GroupType::Dept);
        assert_eq!(view.group_type_menu()[3], GroupTypeMenuItem { group_type: GroupType::Dept, checked: true });
    }
}
