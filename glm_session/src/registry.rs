use crate::{
    config::SessionConfig,
    error::{SessionError, SessionResult},
    history::History,
};
use std::collections::HashMap;

/// Chat histories, either one shared history or one per known user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionRegistry {
    Single(History),
    Multi(HashMap<String, History>),
}

impl SessionRegistry {
    /// Builds the registry the manager starts with: an empty user list gives
    /// a single history, otherwise every listed user gets their own.
    pub fn from_config(config: &SessionConfig) -> Self {
        if !config.is_multi_user() {
            return SessionRegistry::Single(History::new(config.system_prompt.as_str()));
        }
        let mut histories = HashMap::with_capacity(config.multi_user_list.len());
        for user_id in &config.multi_user_list {
            if histories.contains_key(user_id) {
                crate::debug!("Duplicate user `{user_id}` in multi_user_list");
                continue;
            }
            if config.multi_user_system_prompt.contains_key(user_id) {
                crate::info!("Using system prompt override for user `{user_id}`");
            }
            histories.insert(
                user_id.clone(),
                History::new(config.system_prompt_for(user_id)),
            );
        }
        SessionRegistry::Multi(histories)
    }

    pub fn is_multi_user(&self) -> bool {
        matches!(self, SessionRegistry::Multi(_))
    }

    /// Known user ids, sorted. Empty in single-user mode.
    pub fn users(&self) -> Vec<&str> {
        match self {
            SessionRegistry::Single(_) => Vec::new(),
            SessionRegistry::Multi(histories) => {
                let mut users: Vec<&str> = histories.keys().map(String::as_str).collect();
                users.sort_unstable();
                users
            }
        }
    }

    /// The history a call targets. Single-user mode ignores `user_id`.
    pub fn resolve(&self, user_id: Option<&str>) -> SessionResult<&History> {
        match self {
            SessionRegistry::Single(history) => Ok(history),
            SessionRegistry::Multi(histories) => {
                let user_id = user_id.ok_or(SessionError::UserIdRequired)?;
                histories
                    .get(user_id)
                    .ok_or_else(|| SessionError::UserNotFound(user_id.to_owned()))
            }
        }
    }

    pub fn resolve_mut(&mut self, user_id: Option<&str>) -> SessionResult<&mut History> {
        match self {
            SessionRegistry::Single(history) => Ok(history),
            SessionRegistry::Multi(histories) => {
                let user_id = user_id.ok_or(SessionError::UserIdRequired)?;
                histories
                    .get_mut(user_id)
                    .ok_or_else(|| SessionError::UserNotFound(user_id.to_owned()))
            }
        }
    }

    /// A named user's history. Fails in single-user mode.
    pub fn keyed_mut(&mut self, user_id: &str) -> SessionResult<&mut History> {
        match self {
            SessionRegistry::Single(_) => Err(SessionError::SingleUserMode),
            SessionRegistry::Multi(histories) => histories
                .get_mut(user_id)
                .ok_or_else(|| SessionError::UserNotFound(user_id.to_owned())),
        }
    }
}
