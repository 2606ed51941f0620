//! In-memory [`LocalStore`] backed by [`DashMap`].
//!
//! Nothing survives the process. Used by tests and for ephemeral engines
//! that only need the catalog while running.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use wishlist_core::Listing;

use super::LocalStore;
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryStore {
    snapshot: RwLock<Option<Vec<Listing>>>,
    settings: DashMap<String, Value>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn load_snapshot(&self) -> Result<Option<Vec<Listing>>, StoreError> {
        Ok(self.snapshot.read().clone())
    }

    fn save_snapshot(&self, listings: &[Listing]) -> Result<(), StoreError> {
        *self.snapshot.write() = Some(listings.to_vec());
        Ok(())
    }

    fn load_setting(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.settings.get(key).map(|entry| entry.value().clone()))
    }

    fn store_settings(&self, entries: Vec<(&str, Value)>) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.settings.insert(key.to_string(), value);
        }
        Ok(())
    }
}
