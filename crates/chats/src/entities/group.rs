//! Group tree handed out by the directory for the contact list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::member::Member;
use crate::types::ChatError;

/// Dimension used to partition the contact list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    #[default]
    Normal,
    Category,
    Role,
    Dept,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Normal => "normal",
            GroupType::Category => "category",
            GroupType::Role => "role",
            GroupType::Dept => "dept",
        }
    }

    /// Get all group types in menu order
    pub fn all() -> Vec<GroupType> {
        vec![
            GroupType::Normal,
            GroupType::Category,
            GroupType::Role,
            GroupType::Dept,
        ]
    }

    /// Category view keeps empty buckets visible
    pub fn shows_empty_groups(&self) -> bool {
        matches!(self, GroupType::Category)
    }
}

impl FromStr for GroupType {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(GroupType::Normal),
            "category" => Ok(GroupType::Category),
            "role" => Ok(GroupType::Role),
            "dept" => Ok(GroupType::Dept),
            _ => Err(ChatError::invalid_group_type(s)),
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contact row: the member plus the gid of the one-to-one chat with them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactEntry {
    pub gid: String,
    pub member: Member,
}

impl ContactEntry {
    pub fn new(gid: impl Into<String>, member: Member) -> Self {
        Self {
            gid: gid.into(),
            member,
        }
    }

    pub fn is_online(&self) -> bool {
        self.member.is_online()
    }
}

/// A node of the group tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GroupNode {
    Entry(ContactEntry),
    Group(Group),
}

impl GroupNode {
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            GroupNode::Group(group) => Some(group),
            GroupNode::Entry(_) => None,
        }
    }

    pub fn as_entry(&self) -> Option<&ContactEntry> {
        match self {
            GroupNode::Entry(entry) => Some(entry),
            GroupNode::Group(_) => None,
        }
    }
}

/// A titled group. A missing title is the "other" bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: String,
    pub title: Option<String>,
    pub list: Vec<GroupNode>,
}

impl Group {
    pub fn new(id: impl Into<String>, title: Option<String>) -> Self {
        Self {
            id: id.into(),
            title,
            list: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: ContactEntry) -> Self {
        self.list.push(GroupNode::Entry(entry));
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.list.push(GroupNode::Group(group));
        self
    }

    /// Direct contact rows of this group
    pub fn entries(&self) -> impl Iterator<Item = &ContactEntry> {
        self.list.iter().filter_map(GroupNode::as_entry)
    }

    /// Direct child groups
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.list.iter().filter_map(GroupNode::as_group)
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
