//! Committer policy edit session.
//!
//! A [`CommitterPolicyModel`] lives for one "who may post" dialog of one
//! chat. It snapshots the chat's members when the dialog opens, lets the
//! user switch modes and tick members, and hands back a
//! [`CommittersValue`] for whoever persists it. Nothing here writes to the
//! chat or the directory.

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::entities::{Chat, CommittersType, CommittersValue, Member, MemberId};
use crate::repositories::MemberDirectory;

type ChangeListener = Box<dyn Fn(&CommittersValue) + Send + Sync>;

/// Mutable state of one committer policy edit session
pub struct CommitterPolicyModel {
    chat_gid: String,
    mode: CommittersType,
    members: Vec<Member>,
    admins_count: usize,
    whitelist: BTreeSet<MemberId>,
    revision: u64,
    listener: Option<ChangeListener>,
}

/// A member row of the whitelist editor
#[derive(Debug, Clone, PartialEq)]
pub struct WhitelistCandidate<'a> {
    pub member: &'a Member,
    pub checked: bool,
}

impl CommitterPolicyModel {
    /// Open an edit session for `chat`, resolving its members through
    /// `directory`
    pub fn new(chat: &Chat, directory: &dyn MemberDirectory) -> Self {
        Self::from_members(chat, chat.members_set(directory))
    }

    /// Open an edit session over an explicit member snapshot.
    ///
    /// This is the only place the whitelist is seeded: in whitelist mode an
    /// empty stored whitelist is filled with the admins found in the
    /// snapshot. Later mode switches never seed again.
    pub fn from_members(chat: &Chat, members: Vec<Member>) -> Self {
        let stored = chat.committers_value();
        let mode = stored.committers_type();
        let mut whitelist = match stored {
            CommittersValue::Whitelist(ids) => ids,
            _ => BTreeSet::new(),
        };
        let seed = mode == CommittersType::Whitelist && whitelist.is_empty();

        let mut admins_count = 0;
        for member in members.iter().filter(|member| chat.is_admin(member)) {
            admins_count += 1;
            if seed {
                whitelist.insert(member.id);
            }
        }

        debug!(
            chat = %chat.gid,
            %mode,
            members = members.len(),
            admins_count,
            seeded = seed,
            whitelist = whitelist.len(),
            "committer policy session opened"
        );

        Self {
            chat_gid: chat.gid.clone(),
            mode,
            members,
            admins_count,
            whitelist,
            revision: 0,
            listener: None,
        }
    }

    /// Called with the new committers value after every state change
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&CommittersValue) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    pub fn chat_gid(&self) -> &str {
        &self.chat_gid
    }

    pub fn mode(&self) -> CommittersType {
        self.mode
    }

    /// Member snapshot taken when the session opened
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn members_count(&self) -> usize {
        self.members.len()
    }

    pub fn admins_count(&self) -> usize {
        self.admins_count
    }

    pub fn whitelist(&self) -> &BTreeSet<MemberId> {
        &self.whitelist
    }

    pub fn whitelist_len(&self) -> usize {
        self.whitelist.len()
    }

    /// Number of state changes since the session opened
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current value for persistence.
    ///
    /// `Admins` is the dynamic marker and must be resolved against live
    /// admin status by the caller, see [`CommittersValue::resolve`].
    pub fn get_committers(&self) -> CommittersValue {
        match self.mode {
            CommittersType::Whitelist => CommittersValue::Whitelist(self.whitelist.clone()),
            CommittersType::Admins => CommittersValue::Admins,
            CommittersType::All => CommittersValue::All,
        }
    }

    /// Switch mode. The whitelist is left exactly as it is.
    pub fn set_mode(&mut self, mode: CommittersType) {
        debug!(chat = %self.chat_gid, from = %self.mode, to = %mode, "committer mode changed");
        self.mode = mode;
        self.changed();
    }

    /// Tick or untick a member in the whitelist. Returns whether the
    /// whitelist changed.
    ///
    /// Ids outside the session's member snapshot are never added.
    /// Removing is always allowed, which also clears stale entries.
    pub fn toggle_member(&mut self, member_id: MemberId, included: bool) -> bool {
        let changed = if included {
            if self.members.iter().any(|member| member.id == member_id) {
                self.whitelist.insert(member_id)
            } else {
                debug!(chat = %self.chat_gid, member_id, "ignoring non-member for whitelist");
                false
            }
        } else {
            self.whitelist.remove(&member_id)
        };

        if changed {
            self.changed();
        }
        changed
    }

    /// Members in snapshot order with their whitelist state. Stored ids
    /// that are no longer members are not listed.
    pub fn whitelist_candidates(&self) -> impl Iterator<Item = WhitelistCandidate<'_>> {
        self.members.iter().map(|member| WhitelistCandidate {
            member,
            checked: self.whitelist.contains(&member.id),
        })
    }

    /// Whitelisted ids that are not part of the member snapshot
    pub fn stale_whitelist_entries(&self) -> Vec<MemberId> {
        self.whitelist
            .iter()
            .filter(|id| !self.members.iter().any(|member| member.id == **id))
            .copied()
            .collect()
    }

    fn changed(&mut self) {
        self.revision += 1;
        if let Some(listener) = &self.listener {
            listener(&self.get_committers());
        }
    }
}

impl fmt::Debug for CommitterPolicyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitterPolicyModel")
            .field("chat_gid", &self.chat_gid)
            .field("mode", &self.mode)
            .field("members", &self.members.len())
            .field("admins_count", &self.admins_count)
            .field("whitelist", &self.whitelist)
            .field("revision", &self.revision)
            .finish()
    }
}

impl CommittersValue {
    /// Expand the value into the concrete member ids allowed to post,
    /// using the chat's live membership. `None` means no restriction.
    pub fn resolve(&self, chat: &Chat, directory: &dyn MemberDirectory) -> Option<BTreeSet<MemberId>> {
        match self {
            CommittersValue::All => None,
            CommittersValue::Admins => Some(
                chat.members_set(directory)
                    .iter()
                    .filter(|member| chat.is_admin(member))
                    .map(|member| member.id)
                    .collect(),
            ),
            CommittersValue::Whitelist(ids) => Some(ids.clone()),
        }
    }
}
