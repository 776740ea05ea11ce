//! Pure derivation of the contact list from a directory group tree.

use rollcall_chats::{ActiveChatQuery, ContactEntry, Group, GroupNode, GroupType};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pick the grouping to display: this session's choice, then the
/// persisted preference, then `default`. Unrecognised persisted values
/// fall through to `default`.
pub fn resolve_group_type(
    session_override: Option<GroupType>,
    persisted: Option<&str>,
    default: GroupType,
) -> GroupType {
    if let Some(group_type) = session_override {
        return group_type;
    }

    match persisted.map(str::parse::<GroupType>) {
        Some(Ok(group_type)) => group_type,
        Some(Err(err)) => {
            debug!(%err, "ignoring persisted contact grouping");
            default
        }
        None => default,
    }
}

/// Whether `group` starts expanded: true iff it, or any group nested in it,
/// holds the active chat.
///
/// The directory hands out trees, never graphs, so plain recursion is
/// enough.
pub fn default_expand(group: &Group, active_chat: &dyn ActiveChatQuery) -> bool {
    group.list.iter().any(|node| match node {
        GroupNode::Group(child) => default_expand(child, active_chat),
        GroupNode::Entry(entry) => active_chat.is_active_chat(&entry.gid),
    })
}

/// A group as handed to the list renderer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderedGroup {
    pub id: String,
    /// `None` is the "other" bucket
    pub title: Option<String>,
    pub list: Vec<RenderedNode>,
    /// Online contacts in this group and every group below it
    pub online_count: usize,
    /// Contacts in this group and every group below it
    pub total: usize,
    pub default_expand: bool,
}

impl RenderedGroup {
    /// Heading counter: `(0)` when empty, `(online/total)` otherwise
    pub fn count_label(&self) -> String {
        if self.total == 0 {
            "(0)".to_string()
        } else {
            format!("({}/{})", self.online_count, self.total)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ContactEntry> {
        self.list.iter().filter_map(RenderedNode::as_entry)
    }

    pub fn groups(&self) -> impl Iterator<Item = &RenderedGroup> {
        self.list.iter().filter_map(RenderedNode::as_group)
    }

    /// Depth-first search for a group by id, including this one
    pub fn find(&self, id: &str) -> Option<&RenderedGroup> {
        if self.id == id {
            return Some(self);
        }
        self.groups().find_map(|child| child.find(id))
    }
}

/// A row of the rendered list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderedNode {
    Entry(ContactEntry),
    Group(RenderedGroup),
}

impl RenderedNode {
    pub fn as_entry(&self) -> Option<&ContactEntry> {
        match self {
            RenderedNode::Entry(entry) => Some(entry),
            RenderedNode::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&RenderedGroup> {
        match self {
            RenderedNode::Group(group) => Some(group),
            RenderedNode::Entry(_) => None,
        }
    }
}

/// Turn the directory's tree into renderer rows.
///
/// Outside the category view, groups left without rows are dropped, at
/// every depth.
pub fn derive_nodes(
    nodes: Vec<GroupNode>,
    group_type: GroupType,
    active_chat: &dyn ActiveChatQuery,
) -> Vec<RenderedNode> {
    let hide_empty = !group_type.shows_empty_groups();
    nodes
        .into_iter()
        .filter_map(|node| render_node(node, hide_empty, active_chat))
        .collect()
}

fn render_node(
    node: GroupNode,
    hide_empty: bool,
    active_chat: &dyn ActiveChatQuery,
) -> Option<RenderedNode> {
    match node {
        GroupNode::Entry(entry) => Some(RenderedNode::Entry(entry)),
        GroupNode::Group(group) => {
            render_group(group, hide_empty, active_chat).map(RenderedNode::Group)
        }
    }
}

fn render_group(
    group: Group,
    hide_empty: bool,
    active_chat: &dyn ActiveChatQuery,
) -> Option<RenderedGroup> {
    let expand = default_expand(&group, active_chat);
    let list: Vec<RenderedNode> = group
        .list
        .into_iter()
        .filter_map(|node| render_node(node, hide_empty, active_chat))
        .collect();

    if hide_empty && list.is_empty() {
        return None;
    }

    let (online_count, total) = list.iter().fold((0, 0), |(online, total), node| match node {
        RenderedNode::Entry(entry) => (online + usize::from(entry.is_online()), total + 1),
        RenderedNode::Group(child) => (online + child.online_count, total + child.total),
    });

    Some(RenderedGroup {
        id: group.id,
        title: group.title,
        total,
        online_count,
        list,
        default_expand: expand,
    })
}
