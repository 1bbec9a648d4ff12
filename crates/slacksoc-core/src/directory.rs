//! Directory cache of known users and channels.
//!
//! Every entity kind is indexed twice, by id and by name, and both indexes are
//! mutated together under one write lock so they always agree:
//!
//! - for every `id -> entry`, `by_name[entry.name] == id`
//! - for every `name -> id`, `by_id[id].name == name`
//!
//! Reads take the shared lock and return owned clones, so handlers never hold
//! the lock across an `.await`.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// An entity that can live in a [`Directory`] index.
pub trait DirectoryEntry: Clone {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

/// Profile details of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: String,
}

/// A member of the team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub deleted: bool,
}

impl User {
    /// Creates a user with just an id and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

impl DirectoryEntry for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A public channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

impl Channel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl DirectoryEntry for Channel {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
struct Index<T> {
    by_id: HashMap<String, T>,
    by_name: HashMap<String, String>,
}

impl<T> Default for Index<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T: DirectoryEntry> Index<T> {
    fn replace_all(&mut self, entries: Vec<T>) {
        self.by_id.clear();
        self.by_name.clear();
        for entry in entries {
            self.upsert(entry);
        }
    }

    fn upsert(&mut self, entry: T) {
        let id = entry.id().to_string();
        let name = entry.name().to_string();

        // Renamed: drop the old name key.
        if let Some(previous) = self.by_id.get(&id)
            && previous.name() != name
        {
            self.by_name.remove(previous.name());
        }

        // Another entity still claims this name: evict it.
        if let Some(holder) = self.by_name.get(&name)
            && *holder != id
        {
            let holder = holder.clone();
            trace!(evicted = %holder, %name, "evicting stale directory entry");
            self.by_id.remove(&holder);
        }

        self.by_name.insert(name, id.clone());
        self.by_id.insert(id, entry);
    }

    fn remove(&mut self, id: &str) -> Option<T> {
        let entry = self.by_id.remove(id)?;
        if self.by_name.get(entry.name()).is_some_and(|held| held == id) {
            self.by_name.remove(entry.name());
        }
        Some(entry)
    }

    fn get_by_id(&self, id: &str) -> Option<T> {
        self.by_id.get(id).cloned()
    }

    fn get_by_name(&self, name: &str) -> Option<T> {
        self.by_name
            .get(name)
            .and_then(|id| self.by_id.get(id))
            .cloned()
    }

    fn all(&self) -> Vec<T> {
        self.by_id.values().cloned().collect()
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        self.by_id.len() == self.by_name.len()
            && self
                .by_id
                .iter()
                .all(|(id, entry)| self.by_name.get(entry.name()) == Some(id))
            && self
                .by_name
                .iter()
                .all(|(name, id)| self.by_id.get(id).is_some_and(|e| e.name() == name))
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Index<User>,
    channels: Index<Channel>,
}

/// Concurrently readable cache of users and channels.
#[derive(Debug, Default)]
pub struct Directory {
    tables: RwLock<Tables>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_by_id(&self, id: &str) -> Option<User> {
        self.tables.read().users.get_by_id(id)
    }

    pub fn user_by_name(&self, name: &str) -> Option<User> {
        self.tables.read().users.get_by_name(name)
    }

    /// Returns every known user, in no particular order.
    pub fn users(&self) -> Vec<User> {
        self.tables.read().users.all()
    }

    pub fn channel_by_id(&self, id: &str) -> Option<Channel> {
        self.tables.read().channels.get_by_id(id)
    }

    pub fn channel_by_name(&self, name: &str) -> Option<Channel> {
        self.tables.read().channels.get_by_name(name)
    }

    /// Returns every known channel, in no particular order.
    pub fn channels(&self) -> Vec<Channel> {
        self.tables.read().channels.all()
    }

    /// Replaces the whole directory with a fresh snapshot.
    pub fn load(&self, users: Vec<User>, channels: Vec<Channel>) {
        let mut tables = self.tables.write();
        tables.users.replace_all(users);
        tables.channels.replace_all(channels);
    }

    /// Inserts or replaces a user.
    pub fn upsert_user(&self, user: User) {
        self.tables.write().users.upsert(user);
    }

    /// Inserts or replaces a channel.
    pub fn upsert_channel(&self, channel: Channel) {
        self.tables.write().channels.upsert(channel);
    }

    /// Removes a channel by id, returning it if it was known.
    pub fn remove_channel(&self, id: &str) -> Option<Channel> {
        self.tables.write().channels.remove(id)
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let tables = self.tables.read();
        tables.users.is_consistent() && tables.channels.is_consistent()
    }
}
