//! Member directory: the membership source of truth for chats and views.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::entities::{Chat, ContactEntry, Group, GroupNode, GroupType, Member, MemberId, MemberStatus};
use crate::types::{ChatError, ChatEvent, ChatResult, EventBus};

/// Read access to membership data.
///
/// Calls are synchronous; implementations backed by a remote service are
/// expected to answer from a local cache.
pub trait MemberDirectory: Send + Sync {
    /// Look up a single member
    fn member(&self, id: MemberId) -> Option<Member>;

    /// All known members, ordered by id
    fn members(&self) -> Vec<Member>;

    /// Contacts of the signed-in user partitioned by `group_type`.
    /// The partitioning rules belong to the directory.
    fn contact_groups(&self, group_type: GroupType) -> ChatResult<Vec<GroupNode>>;
}

/// Answers whether a chat is the one currently open
pub trait ActiveChatQuery: Send + Sync {
    fn is_active_chat(&self, gid: &str) -> bool;
}

/// Department node used by the dept grouping
#[derive(Debug, Clone, PartialEq)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub parent: Option<i64>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    members: BTreeMap<MemberId, Member>,
    self_id: Option<MemberId>,
    categories: Vec<String>,
    contact_categories: BTreeMap<MemberId, String>,
    roles: Vec<(String, String)>,
    departments: Vec<Department>,
    active_chat: Option<String>,
    unavailable: Option<String>,
}

/// In-process directory.
///
/// Mutators notify an attached [`EventBus`] after the write lock is
/// released, so handlers may read the directory from inside the callback.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
    bus: Option<EventBus>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that announces its changes on `bus`
    pub fn with_bus(bus: EventBus) -> Self {
        Self {
            state: RwLock::default(),
            bus: Some(bus),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DirectoryState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, event: ChatEvent) {
        if let Some(bus) = &self.bus {
            bus.emit(event);
        }
    }

    /// Insert or replace a member
    pub fn upsert_member(&self, member: Member) {
        let member_id = member.id;
        let existed = self.write().members.insert(member_id, member).is_some();
        self.notify(if existed {
            ChatEvent::MemberUpdated { member_id }
        } else {
            ChatEvent::MemberAdded { member_id }
        });
    }

    /// Remove a member, returning it if it was known
    pub fn remove_member(&self, member_id: MemberId) -> Option<Member> {
        let removed = {
            let mut state = self.write();
            state.contact_categories.remove(&member_id);
            state.members.remove(&member_id)
        };
        if removed.is_some() {
            self.notify(ChatEvent::MemberRemoved { member_id });
        }
        removed
    }

    /// Change a member's presence
    pub fn set_status(&self, member_id: MemberId, status: MemberStatus) -> ChatResult<()> {
        {
            let mut state = self.write();
            let member = state
                .members
                .get_mut(&member_id)
                .ok_or_else(|| ChatError::member_not_found(member_id))?;
            member.status = status;
        }
        self.notify(if status.is_online() {
            ChatEvent::UserOnline { member_id }
        } else {
            ChatEvent::UserOffline { member_id }
        });
        Ok(())
    }

    /// Mark the signed-in member; they are excluded from their own contacts
    pub fn set_self(&self, member_id: Option<MemberId>) {
        self.write().self_id = member_id;
        self.notify(ChatEvent::DirectoryRefreshed);
    }

    /// Declare a contact category; declared categories are listed even when empty
    pub fn define_category(&self, name: impl Into<String>) {
        let name = name.into();
        {
            let mut state = self.write();
            if !state.categories.contains(&name) {
                state.categories.push(name);
            }
        }
        self.notify(ChatEvent::DirectoryRefreshed);
    }

    /// File a contact under a category, or clear it with `None`
    pub fn set_contact_category(&self, member_id: MemberId, category: Option<String>) {
        {
            let mut state = self.write();
            match category {
                Some(name) => {
                    if !state.categories.contains(&name) {
                        state.categories.push(name.clone());
                    }
                    state.contact_categories.insert(member_id, name);
                }
                None => {
                    state.contact_categories.remove(&member_id);
                }
            }
        }
        self.notify(ChatEvent::MemberUpdated { member_id });
    }

    /// Declare a role code with its display name
    pub fn define_role(&self, code: impl Into<String>, name: impl Into<String>) {
        let code = code.into();
        let name = name.into();
        {
            let mut state = self.write();
            match state.roles.iter_mut().find(|(existing, _)| *existing == code) {
                Some(entry) => entry.1 = name,
                None => state.roles.push((code, name)),
            }
        }
        self.notify(ChatEvent::DirectoryRefreshed);
    }

    /// Declare a department
    pub fn define_department(&self, department: Department) {
        {
            let mut state = self.write();
            state.departments.retain(|dept| dept.id != department.id);
            state.departments.push(department);
        }
        self.notify(ChatEvent::DirectoryRefreshed);
    }

    /// Focus a chat, or clear the focus
    pub fn set_active_chat(&self, gid: Option<String>) {
        self.write().active_chat = gid.clone();
        self.notify(ChatEvent::ActiveChatChanged { chat_id: gid });
    }

    /// Simulate the backing service going away. While unavailable,
    /// [`MemberDirectory::contact_groups`] fails.
    pub fn set_unavailable(&self, reason: Option<String>) {
        let recovered = {
            let mut state = self.write();
            let was_unavailable = state.unavailable.is_some();
            state.unavailable = reason;
            was_unavailable && state.unavailable.is_none()
        };
        if recovered {
            self.notify(ChatEvent::DirectoryRefreshed);
        }
    }
}

impl DirectoryState {
    fn contacts(&self) -> Vec<ContactEntry> {
        let mut contacts: Vec<ContactEntry> = self
            .members
            .values()
            .filter(|member| Some(member.id) != self.self_id)
            .map(|member| {
                let gid = match self.self_id {
                    Some(me) => Chat::one2one_gid(me, member.id),
                    None => member.id.to_string(),
                };
                ContactEntry::new(gid, member.clone())
            })
            .collect();

        // online first, then by name
        contacts.sort_by(|a, b| {
            b.is_online()
                .cmp(&a.is_online())
                .then_with(|| a.member.display_name().cmp(b.member.display_name()))
        });
        contacts
    }

    fn by_category(&self, contacts: Vec<ContactEntry>) -> Vec<GroupNode> {
        let mut groups: Vec<Group> = self
            .categories
            .iter()
            .map(|name| Group::new(format!("category:{name}"), Some(name.clone())))
            .collect();
        let mut other = Group::new("category:", None);

        for contact in contacts {
            let index = self
                .contact_categories
                .get(&contact.member.id)
                .and_then(|name| groups.iter().position(|g| g.title.as_ref() == Some(name)));
            match index {
                Some(index) => groups[index].list.push(GroupNode::Entry(contact)),
                None => other.list.push(GroupNode::Entry(contact)),
            }
        }

        groups.push(other);
        groups.into_iter().map(GroupNode::Group).collect()
    }

    fn by_role(&self, contacts: Vec<ContactEntry>) -> Vec<GroupNode> {
        let mut groups: Vec<(String, Group)> = self
            .roles
            .iter()
            .map(|(code, name)| (code.clone(), Group::new(format!("role:{code}"), Some(name.clone()))))
            .collect();
        let mut other = Group::new("role:", None);

        for contact in contacts {
            let Some(code) = contact.member.role.clone().filter(|code| !code.is_empty()) else {
                other.list.push(GroupNode::Entry(contact));
                continue;
            };
            match groups.iter_mut().find(|(existing, _)| *existing == code) {
                Some((_, group)) => group.list.push(GroupNode::Entry(contact)),
                None => {
                    let group = Group::new(format!("role:{code}"), Some(code.clone()))
                        .with_entry(contact);
                    groups.push((code, group));
                }
            }
        }

        groups
            .into_iter()
            .map(|(_, group)| group)
            .chain(std::iter::once(other))
            .map(GroupNode::Group)
            .collect()
    }

    fn by_dept(&self, contacts: Vec<ContactEntry>) -> Vec<GroupNode> {
        let mut by_dept: BTreeMap<i64, Vec<ContactEntry>> = BTreeMap::new();
        let mut other = Group::new("dept:", None);

        for contact in contacts {
            match contact
                .member
                .dept
                .filter(|id| self.departments.iter().any(|dept| dept.id == *id))
            {
                Some(dept) => by_dept.entry(dept).or_default().push(contact),
                None => other.list.push(GroupNode::Entry(contact)),
            }
        }

        // Every department has at most one parent, so walking down from
        // the roots never revisits a node.
        let roots = self.departments.iter().filter(|dept| {
            dept.parent
                .map_or(true, |parent| !self.departments.iter().any(|d| d.id == parent))
        });

        let mut groups: Vec<GroupNode> = roots
            .map(|dept| GroupNode::Group(self.dept_group(dept, &mut by_dept)))
            .collect();

        // departments not reachable from a root
        for (_, stranded) in by_dept {
            other.list.extend(stranded.into_iter().map(GroupNode::Entry));
        }
        groups.push(GroupNode::Group(other));
        groups
    }

    fn dept_group(&self, dept: &Department, by_dept: &mut BTreeMap<i64, Vec<ContactEntry>>) -> Group {
        let mut group = Group::new(format!("dept:{}", dept.id), Some(dept.name.clone()));
        for contact in by_dept.remove(&dept.id).unwrap_or_default() {
            group.list.push(GroupNode::Entry(contact));
        }
        for child in self
            .departments
            .iter()
            .filter(|child| child.parent == Some(dept.id) && child.id != dept.id)
        {
            group.list.push(GroupNode::Group(self.dept_group(child, by_dept)));
        }
        group
    }
}

impl MemberDirectory for InMemoryDirectory {
    fn member(&self, id: MemberId) -> Option<Member> {
        self.read().members.get(&id).cloned()
    }

    fn members(&self) -> Vec<Member> {
        self.read().members.values().cloned().collect()
    }

    fn contact_groups(&self, group_type: GroupType) -> ChatResult<Vec<GroupNode>> {
        let state = self.read();
        if let Some(reason) = &state.unavailable {
            return Err(ChatError::directory_unavailable(reason.clone()));
        }

        let contacts = state.contacts();
        debug!(%group_type, contacts = contacts.len(), "partitioning contacts");

        Ok(match group_type {
            GroupType::Normal => contacts.into_iter().map(GroupNode::Entry).collect(),
            GroupType::Category => state.by_category(contacts),
            GroupType::Role => state.by_role(contacts),
            GroupType::Dept => state.by_dept(contacts),
        })
    }
}

impl ActiveChatQuery for InMemoryDirectory {
    fn is_active_chat(&self, gid: &str) -> bool {
        self.read().active_chat.as_deref() == Some(gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn seeded() -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        directory.upsert_member(Member::new(1, "me"));
        directory.upsert_member(Member::new(2, "bob").with_role("dev").with_dept(10));
        directory
            .upsert_member(Member::new(3, "amy").with_role("pm").with_dept(11).with_status(MemberStatus::Online));
        directory.upsert_member(Member::new(4, "zed"));
        directory.set_self(Some(1));
        directory
    }

    fn titles(nodes: &[GroupNode]) -> Vec<Option<String>> {
        nodes
            .iter()
            .filter_map(GroupNode::as_group)
            .map(|group| group.title.clone())
            .collect()
    }

    #[test]
    fn test_normal_is_flat_and_online_first() {
        let directory = seeded();
        let nodes = directory.contact_groups(GroupType::Normal).unwrap();
        let gids: Vec<_> = nodes.iter().filter_map(GroupNode::as_entry).map(|e| e.gid.clone()).collect();
        assert_eq!(gids, vec!["1&3", "1&2", "1&4"]);
    }

    #[test]
    fn test_category_always_has_other_bucket() {
        let directory = seeded();
        directory.define_category("Friends");
        directory.set_contact_category(2, Some("Work".to_string()));

        let nodes = directory.contact_groups(GroupType::Category).unwrap();
        assert_eq!(
            titles(&nodes),
            vec![Some("Friends".to_string()), Some("Work".to_string()), None]
        );
        let friends = nodes[0].as_group().unwrap();
        assert!(friends.is_empty());
        let other = nodes[2].as_group().unwrap();
        assert_eq!(other.entries().count(), 2);
    }

    #[test]
    fn test_role_grouping_uses_role_names() {
        let directory = seeded();
        directory.define_role("dev", "Developer");
        directory.define_role("qa", "Tester");

        let nodes = directory.contact_groups(GroupType::Role).unwrap();
        assert_eq!(
            titles(&nodes),
            vec![
                Some("Developer".to_string()),
                Some("Tester".to_string()),
                Some("pm".to_string()),
                None
            ]
        );
    }

    #[test]
    fn test_dept_grouping_is_nested() {
        let directory = seeded();
        directory.define_department(Department { id: 10, name: "R&D".into(), parent: None });
        directory.define_department(Department { id: 11, name: "Product".into(), parent: Some(10) });

        let nodes = directory.contact_groups(GroupType::Dept).unwrap();
        assert_eq!(titles(&nodes), vec![Some("R&D".to_string()), None]);

        let rnd = nodes[0].as_group().unwrap();
        assert_eq!(rnd.entries().count(), 1);
        let product = rnd.groups().next().unwrap();
        assert_eq!(product.title.as_deref(), Some("Product"));
        assert_eq!(product.entries().next().unwrap().member.id, 3);
    }

    #[test]
    fn test_unavailable_directory_fails_groups_only() {
        let directory = seeded();
        directory.set_unavailable(Some("offline".to_string()));
        assert!(matches!(
            directory.contact_groups(GroupType::Normal),
            Err(ChatError::DirectoryUnavailable { .. })
        ));
        assert!(directory.member(2).is_some());

        directory.set_unavailable(None);
        assert!(directory.contact_groups(GroupType::Normal).is_ok());
    }

    #[test]
    fn test_active_chat_query() {
        let directory = seeded();
        assert!(!directory.is_active_chat("1&2"));
        directory.set_active_chat(Some("1&2".to_string()));
        assert!(directory.is_active_chat("1&2"));
        directory.set_active_chat(None);
        assert!(!directory.is_active_chat("1&2"));
    }

    #[test]
    fn test_mutations_are_announced() {
        let bus = EventBus::new();
        let directory = Arc::new(InMemoryDirectory::with_bus(bus.clone()));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = Arc::clone(&directory);
        let log = Arc::clone(&seen);
        let _subscription = bus.on_data_change(move |envelope| {
            // reading from inside the handler must not deadlock
            let count = reader.members().len();
            log.lock().unwrap().push((envelope.event.clone(), count));
        });

        directory.upsert_member(Member::new(5, "eve"));
        directory.upsert_member(Member::new(5, "eve").with_role("ops"));
        directory.set_status(5, MemberStatus::Online).unwrap();
        directory.remove_member(5);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (ChatEvent::MemberAdded { member_id: 5 }, 1),
                (ChatEvent::MemberUpdated { member_id: 5 }, 1),
                (ChatEvent::UserOnline { member_id: 5 }, 1),
                (ChatEvent::MemberRemoved { member_id: 5 }, 0),
            ]
        );
    }

    #[test]
    fn test_set_status_unknown_member() {
        let directory = seeded();
        assert_eq!(
            directory.set_status(42, MemberStatus::Online),
            Err(ChatError::member_not_found(42))
        );
    }
}
