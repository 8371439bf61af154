//! Chatroom registry: which chatrooms exist and what they are called
//!
//! Persisted as a whole under its own key, independent of any chatroom's
//! history. Deleting a chatroom leaves its history in the store.

use serde::{Deserialize, Serialize};

use crate::models::{Chatroom, IdGenerator};
use crate::store::{SharedStore, StoreError};

/// Storage key for the registry.
pub const REGISTRY_KEY: &str = "chat-storage";

/// Layout version written alongside the registry.
const REGISTRY_VERSION: u32 = 0;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("chatroom name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode chatroom registry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-disk layout: `{"state":{"chatrooms":[...]},"version":0}`.
#[derive(Serialize, Deserialize)]
struct Persisted {
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct PersistedState {
    chatrooms: Vec<Chatroom>,
}

pub struct ChatroomRegistry {
    store: SharedStore,
    chatrooms: Vec<Chatroom>,
    ids: IdGenerator,
}

impl ChatroomRegistry {
    /// Load the registry from `store`. A missing or malformed entry yields an
    /// empty registry; only a failing store is an error.
    pub fn load(store: SharedStore) -> Result<Self, RegistryError> {
        let chatrooms = match store.get(REGISTRY_KEY)? {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Persisted>(&raw) {
                Ok(persisted) => persisted.state.chatrooms,
                Err(e) => {
                    tracing::warn!("Malformed chatroom registry: {}; starting empty", e);
                    Vec::new()
                }
            },
        };

        let mut ids = IdGenerator::new();
        for room in &chatrooms {
            ids.observe(&room.id);
        }

        tracing::debug!("Loaded {} chatrooms", chatrooms.len());
        Ok(Self {
            store,
            chatrooms,
            ids,
        })
    }

    /// All chatrooms in creation order.
    pub fn list(&self) -> &[Chatroom] {
        &self.chatrooms
    }

    pub fn get(&self, id: &str) -> Option<&Chatroom> {
        self.chatrooms.iter().find(|room| room.id == id)
    }

    /// Chatrooms whose name contains `query`, ignoring case. An empty query
    /// matches everything.
    pub fn search(&self, query: &str) -> Vec<&Chatroom> {
        let query = query.trim().to_lowercase();
        self.chatrooms
            .iter()
            .filter(|room| room.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Create a chatroom with a fresh id.
    pub fn create(&mut self, name: &str) -> Result<Chatroom, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let room = Chatroom {
            id: self.ids.next_id(),
            name: name.to_string(),
        };
        self.chatrooms.push(room.clone());
        if let Err(e) = self.save() {
            self.chatrooms.pop();
            return Err(e);
        }

        tracing::info!("Created chatroom {} ({})", room.name, room.id);
        Ok(room)
    }

    /// Remove a chatroom. Returns whether one was removed. Its history stays
    /// in the store.
    pub fn delete(&mut self, id: &str) -> Result<bool, RegistryError> {
        let Some(pos) = self.chatrooms.iter().position(|room| room.id == id) else {
            return Ok(false);
        };

        let removed = self.chatrooms.remove(pos);
        if let Err(e) = self.save() {
            self.chatrooms.insert(pos, removed);
            return Err(e);
        }

        tracing::info!("Deleted chatroom {} ({})", removed.name, removed.id);
        Ok(true)
    }

    fn save(&self) -> Result<(), RegistryError> {
        let persisted = Persisted {
            state: PersistedState {
                chatrooms: self.chatrooms.clone(),
            },
            version: REGISTRY_VERSION,
        };
        let json = serde_json::to_string(&persisted)?;
        self.store.set(REGISTRY_KEY, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{history_key, KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn registry() -> (ChatroomRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ChatroomRegistry::load(store.clone()).unwrap(), store)
    }

    #[test]
    fn test_create_and_list() {
        let (mut reg, _) = registry();
        let a = reg.create("  Travel plans ").unwrap();
        let b = reg.create("Recipes").unwrap();
        assert_eq!(a.name, "Travel plans");
        assert_ne!(a.id, b.id);

        let names: Vec<_> = reg.list().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Travel plans", "Recipes"]);
        assert_eq!(reg.get(&b.id), Some(&b));
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let (mut reg, store) = registry();
        assert!(matches!(reg.create("   "), Err(RegistryError::EmptyName)));
        assert!(reg.list().is_empty());
        assert_eq!(store.get(REGISTRY_KEY).unwrap(), None);
    }

    #[test]
    fn test_persisted_layout() {
        let (mut reg, store) = registry();
        let room = reg.create("Work").unwrap();

        let raw = store.get(REGISTRY_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "state": {"chatrooms": [{"id": room.id, "name": "Work"}]},
                "version": 0
            })
        );
    }

    #[test]
    fn test_reload() {
        let (mut reg, store) = registry();
        let room = reg.create("Persisted").unwrap();

        let mut reloaded = ChatroomRegistry::load(store).unwrap();
        assert_eq!(reloaded.list(), &[room.clone()]);

        // New ids keep increasing after a reload.
        let next = reloaded.create("Another").unwrap();
        assert!(next.id.parse::<i64>().unwrap() > room.id.parse::<i64>().unwrap());
    }

    #[test]
    fn test_delete_keeps_history() {
        let (mut reg, store) = registry();
        let room = reg.create("Old").unwrap();
        store.set(&history_key(&room.id), "[]").unwrap();

        assert!(reg.delete(&room.id).unwrap());
        assert!(!reg.delete(&room.id).unwrap());
        assert!(reg.list().is_empty());
        assert_eq!(store.get(&history_key(&room.id)).unwrap().as_deref(), Some("[]"));

        let reloaded = ChatroomRegistry::load(store).unwrap();
        assert!(reloaded.list().is_empty());
    }

    #[test]
    fn test_search() {
        let (mut reg, _) = registry();
        reg.create("Gardening").unwrap();
        reg.create("Garage sale").unwrap();
        reg.create("Books").unwrap();

        let names = |q: &str| -> Vec<String> {
            reg.search(q).iter().map(|r| r.name.clone()).collect()
        };
        assert_eq!(names("gar"), vec!["Gardening", "Garage sale"]);
        assert_eq!(names("BOOK"), vec!["Books"]);
        assert_eq!(names("").len(), 3);
        assert!(names("zzz").is_empty());
    }

    #[test]
    fn test_malformed_registry_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(REGISTRY_KEY, "[1, 2").unwrap();
        let reg = ChatroomRegistry::load(store).unwrap();
        assert!(reg.list().is_empty());
    }
}
