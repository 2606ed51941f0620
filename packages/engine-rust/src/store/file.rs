//! Directory-backed [`LocalStore`].
//!
//! Layout:
//! - `games.json`: JSON array of listings
//! - `settings.json`: flat JSON object of settings
//!
//! Every write goes to a sibling temp file that is then renamed over the
//! target, so a crash mid-write leaves the previous file intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;
use wishlist_core::Listing;

use super::LocalStore;
use crate::error::StoreError;

pub const SNAPSHOT_FILE: &str = "games.json";
pub const SETTINGS_FILE: &str = "settings.json";

pub struct FileStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on the settings file.
    settings_lock: Mutex<()>,
}

impl FileStore {
    /// Store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            settings_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| StoreError::Write { path, source }
        };

        fs::create_dir_all(&self.dir).map_err(write_err(&self.dir))?;
        fs::write(&tmp, bytes).map_err(write_err(&tmp))?;
        fs::rename(&tmp, &target).map_err(write_err(&target))?;
        debug!(path = %target.display(), bytes = bytes.len(), "wrote file");
        Ok(())
    }

    fn read_settings(&self) -> Result<Map<String, Value>, StoreError> {
        let path = self.dir.join(SETTINGS_FILE);
        let Some(bytes) = Self::read_optional(&path)? else {
            return Ok(Map::new());
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
            what: path.display().to_string(),
            source,
        })
    }
}

impl LocalStore for FileStore {
    fn load_snapshot(&self) -> Result<Option<Vec<Listing>>, StoreError> {
        let path = self.dir.join(SNAPSHOT_FILE);
        let Some(bytes) = Self::read_optional(&path)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                what: path.display().to_string(),
                source,
            })
    }

    fn save_snapshot(&self, listings: &[Listing]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(listings).map_err(|source| StoreError::Decode {
            what: SNAPSHOT_FILE.to_string(),
            source,
        })?;
        self.write_atomic(SNAPSHOT_FILE, &bytes)
    }

    fn load_setting(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.settings_lock.lock();
        Ok(self.read_settings()?.remove(key))
    }

    fn store_settings(&self, entries: Vec<(&str, Value)>) -> Result<(), StoreError> {
        let _guard = self.settings_lock.lock();
        let mut settings = self.read_settings()?;
        for (key, value) in entries {
            settings.insert(key.to_string(), value);
        }
        let bytes =
            serde_json::to_vec_pretty(&settings).map_err(|source| StoreError::Decode {
                what: SETTINGS_FILE.to_string(),
                source,
            })?;
        self.write_atomic(SETTINGS_FILE, &bytes)
    }
}
