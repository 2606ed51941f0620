//! Local persistence: catalog snapshot and small key-value settings.
//!
//! The [`LocalStore`] trait is synchronous; every value is small enough to be
//! read or written in one step. Typed accessors for the known settings keys
//! live here so both backends share the same layout.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wishlist_core::Listing;

use crate::error::StoreError;

/// Highest `last_modified` seen by a successful sync, epoch ms.
pub const LAST_UPDATE_TIMESTAMP: &str = "LastUpdateTimestamp";
/// Wall-clock time of the last sync that fetched records, epoch ms.
pub const LAST_API_UPDATE_TIMESTAMP: &str = "LastAPIUpdateTimestamp";
/// Ordered favorites, `[{"id": n}, ...]`.
pub const FAVORITES_KEY: &str = "Favorites.Games.Array";

/// Persisted favorite entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub id: i64,
}

/// Storage backend for snapshot and settings.
pub trait LocalStore: Send + Sync {
    /// Loads the catalog snapshot, or `None` if none was ever written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the snapshot exists but cannot be read or decoded.
    fn load_snapshot(&self) -> Result<Option<Vec<Listing>>, StoreError>;

    /// Replaces the catalog snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the snapshot cannot be written.
    fn save_snapshot(&self, listings: &[Listing]) -> Result<(), StoreError>;

    /// Reads a setting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the settings cannot be read.
    fn load_setting(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Writes several settings in one step.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the settings cannot be written.
    fn store_settings(&self, entries: Vec<(&str, Value)>) -> Result<(), StoreError>;

    /// Writes a single setting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the setting cannot be written.
    fn store_setting(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.store_settings(vec![(key, value)])
    }
}

// ---------------------------------------------------------------------------
// Typed settings
// ---------------------------------------------------------------------------

fn decode_setting<T: serde::de::DeserializeOwned>(
    key: &str,
    value: Value,
) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Decode {
        what: key.to_string(),
        source,
    })
}

/// Stored watermark, if any.
///
/// # Errors
///
/// Returns [`StoreError`] if the setting cannot be read or is not an integer.
pub fn load_watermark(store: &dyn LocalStore) -> Result<Option<i64>, StoreError> {
    store
        .load_setting(LAST_UPDATE_TIMESTAMP)?
        .map(|value| decode_setting(LAST_UPDATE_TIMESTAMP, value))
        .transpose()
}

/// Stored time of the last sync that fetched records, if any.
///
/// # Errors
///
/// Returns [`StoreError`] if the setting cannot be read or is not an integer.
pub fn load_last_attempt(store: &dyn LocalStore) -> Result<Option<i64>, StoreError> {
    store
        .load_setting(LAST_API_UPDATE_TIMESTAMP)?
        .map(|value| decode_setting(LAST_API_UPDATE_TIMESTAMP, value))
        .transpose()
}

/// Persists the watermark and the attempt timestamp together.
///
/// # Errors
///
/// Returns [`StoreError`] if the settings cannot be written.
pub fn store_sync_marks(
    store: &dyn LocalStore,
    watermark: i64,
    attempted_at: i64,
) -> Result<(), StoreError> {
    store.store_settings(vec![
        (LAST_UPDATE_TIMESTAMP, Value::from(watermark)),
        (LAST_API_UPDATE_TIMESTAMP, Value::from(attempted_at)),
    ])
}

/// Stored favorite ids in display order. Missing means none.
///
/// # Errors
///
/// Returns [`StoreError`] if the setting cannot be read or decoded.
pub fn load_favorites(store: &dyn LocalStore) -> Result<Vec<i64>, StoreError> {
    let entries: Vec<FavoriteEntry> = store
        .load_setting(FAVORITES_KEY)?
        .map(|value| decode_setting(FAVORITES_KEY, value))
        .transpose()?
        .unwrap_or_default();
    Ok(entries.into_iter().map(|entry| entry.id).collect())
}

/// # Errors
///
/// Returns [`StoreError`] if the setting cannot be written.
pub fn store_favorites(store: &dyn LocalStore, ids: &[i64]) -> Result<(), StoreError> {
    let entries: Vec<FavoriteEntry> = ids.iter().map(|&id| FavoriteEntry { id }).collect();
    let value = serde_json::to_value(entries).map_err(|source| StoreError::Decode {
        what: FAVORITES_KEY.to_string(),
        source,
    })?;
    store.store_setting(FAVORITES_KEY, value)
}
