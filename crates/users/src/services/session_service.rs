//! In-memory sign-in session with per-user preference records.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rollcall_chats::{ChatEvent, EventBus};
use tracing::{debug, info};

use super::preferences::PreferenceStore;
use crate::entities::{User, UserConfig};
use crate::types::{UserError, UserId, UserResult};

/// Holds the signed-in user and keeps each user's config across sign-outs
#[derive(Debug, Default)]
pub struct UserSession {
    current: RwLock<Option<User>>,
    saved_configs: RwLock<HashMap<UserId, UserConfig>>,
    bus: Option<EventBus>,
}

impl UserSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session that announces preference changes on `bus`
    pub fn with_bus(bus: EventBus) -> Self {
        Self {
            bus: Some(bus),
            ..Self::default()
        }
    }

    fn current(&self) -> RwLockReadGuard<'_, Option<User>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_mut(&self) -> RwLockWriteGuard<'_, Option<User>> {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn saved(&self) -> RwLockWriteGuard<'_, HashMap<UserId, UserConfig>> {
        self.saved_configs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, user_id: UserId) {
        if let Some(bus) = &self.bus {
            bus.emit(ChatEvent::PreferencesChanged { user_id });
        }
    }

    /// Sign a user in. A config saved for this user earlier replaces the
    /// one carried by `user`.
    pub fn sign_in(&self, mut user: User) {
        if let Some(config) = self.saved().get(&user.id).cloned() {
            user.config = config;
        }
        user.mark_login();
        let user_id = user.id;
        info!(user_id, account = %user.account, "user signed in");

        *self.current_mut() = Some(user);
        self.notify(user_id);
    }

    /// Sign out, keeping the user's config for the next sign-in
    pub fn sign_out(&self) -> Option<User> {
        let user = self.current_mut().take()?;
        self.saved().insert(user.id, user.config.clone());
        info!(user_id = user.id, "user signed out");

        self.notify(user.id);
        Some(user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Config stored for a user, signed in or not
    pub fn config_for(&self, user_id: UserId) -> UserResult<UserConfig> {
        if let Some(user) = self.current().as_ref().filter(|user| user.id == user_id) {
            return Ok(user.config.clone());
        }
        self.saved()
            .get(&user_id)
            .cloned()
            .ok_or(UserError::UserNotFound)
    }
}

impl PreferenceStore for UserSession {
    fn current_user(&self) -> Option<User> {
        self.current().clone()
    }

    fn set_contacts_group_by_type(&self, value: &str) -> UserResult<()> {
        if value.trim().is_empty() {
            return Err(UserError::InvalidSettingsData(
                "contactsGroupByType cannot be blank".to_string(),
            ));
        }

        let user_id = {
            let mut current = self.current_mut();
            let user = current.as_mut().ok_or(UserError::NotAuthenticated)?;
            user.config.set_contacts_group_by_type(value);
            self.saved().insert(user.id, user.config.clone());
            user.id
        };

        debug!(user_id, value, "contact grouping saved");
        self.notify(user_id);
        Ok(())
    }
}
