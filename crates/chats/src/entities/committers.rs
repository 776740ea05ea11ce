//! Committer policy types and their stored string form.
//!
//! A chat stores its committers as a single string:
//!
//! - `""` or `"$ALL"`: everybody may post
//! - `"$ADMINS"`: whoever is an admin at the time of the check
//! - anything else: comma separated member ids
//!
//! An explicit but empty whitelist is stored as `","` so that it does not
//! read back as "everybody".

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::member::MemberId;
use crate::types::ChatError;

pub const COMMITTERS_ALL: &str = "$ALL";
pub const COMMITTERS_ADMINS: &str = "$ADMINS";

/// Which identities may post in a chat
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommittersType {
    #[default]
    All,
    Admins,
    Whitelist,
}

impl CommittersType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommittersType::All => "all",
            CommittersType::Admins => "admins",
            CommittersType::Whitelist => "whitelist",
        }
    }

    /// Get all committer types in selector order
    pub fn all() -> Vec<CommittersType> {
        vec![
            CommittersType::All,
            CommittersType::Admins,
            CommittersType::Whitelist,
        ]
    }
}

impl FromStr for CommittersType {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(CommittersType::All),
            "admins" => Ok(CommittersType::Admins),
            "whitelist" => Ok(CommittersType::Whitelist),
            other => Err(ChatError::validation(format!(
                "unknown committers type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for CommittersType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The committers value handed back to whoever persists the policy.
///
/// `Admins` is a dynamic marker, not a frozen list. Use
/// [`CommittersValue::resolve`] against live membership to expand it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommittersValue {
    /// No restriction
    #[default]
    All,
    /// Every current admin, evaluated at check time
    Admins,
    /// Explicit member set
    Whitelist(BTreeSet<MemberId>),
}

impl CommittersValue {
    /// Parse the stored string form. Never fails: unparseable id fragments
    /// are dropped.
    pub fn from_wire(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == COMMITTERS_ALL {
            return CommittersValue::All;
        }
        if trimmed == COMMITTERS_ADMINS {
            return CommittersValue::Admins;
        }

        let ids = trimmed
            .split(',')
            .filter_map(|part| part.trim().parse::<MemberId>().ok())
            .collect();
        CommittersValue::Whitelist(ids)
    }

    /// Render the stored string form
    pub fn to_wire(&self) -> String {
        match self {
            CommittersValue::All => String::new(),
            CommittersValue::Admins => COMMITTERS_ADMINS.to_string(),
            CommittersValue::Whitelist(ids) if ids.is_empty() => ",".to_string(),
            CommittersValue::Whitelist(ids) => ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    pub fn committers_type(&self) -> CommittersType {
        match self {
            CommittersValue::All => CommittersType::All,
            CommittersValue::Admins => CommittersType::Admins,
            CommittersValue::Whitelist(_) => CommittersType::Whitelist,
        }
    }

    /// The explicit member set, if this is a whitelist
    pub fn whitelist(&self) -> Option<&BTreeSet<MemberId>> {
        match self {
            CommittersValue::Whitelist(ids) => Some(ids),
            _ => None,
        }
    }
}

impl fmt::Display for CommittersValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for CommittersValue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CommittersValue::from_wire(s))
    }
}

impl Serialize for CommittersValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for CommittersValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CommittersValue::from_wire(&raw))
    }
}
