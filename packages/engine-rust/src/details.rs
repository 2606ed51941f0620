//! Detail lookups with a bounded in-memory cache.

use std::sync::Arc;

use quick_cache::sync::Cache;
use tracing::{debug, warn};
use wishlist_core::{decode_details, Details, WireDetails};

use crate::error::SyncError;
use crate::source::ListingSource;

pub struct DetailsCache {
    cache: Cache<i64, Arc<Details>>,
}

impl DetailsCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Cache::new(capacity.max(1)),
        }
    }

    /// Cached record for `id`, without fetching.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<Arc<Details>> {
        self.cache.get(&id)
    }

    /// Returns the detail record for `id`, fetching it on a cache miss.
    /// `Ok(None)` means the API has no such record.
    ///
    /// # Errors
    ///
    /// Propagates fetch failures from `source`.
    pub async fn fetch(
        &self,
        source: &dyn ListingSource,
        id: i64,
    ) -> Result<Option<Arc<Details>>, SyncError> {
        if let Some(hit) = self.cache.get(&id) {
            debug!(id, "details cache hit");
            return Ok(Some(hit));
        }

        let page = source.fetch_details(id).await?;
        let Some(items) = page.items else {
            return Err(SyncError::EnvelopeDecodeFailed {
                reason: "details response has no Items array".to_string(),
            });
        };
        let Some(first) = items.into_iter().next() else {
            return Ok(None);
        };
        let raw: WireDetails =
            serde_json::from_value(first).map_err(|err| SyncError::EnvelopeDecodeFailed {
                reason: err.to_string(),
            })?;
        let Some(details) = decode_details(&raw) else {
            warn!(id, "details record has no usable id");
            return Ok(None);
        };

        let details = Arc::new(details);
        self.cache.insert(id, Arc::clone(&details));
        Ok(Some(details))
    }

    pub fn invalidate(&self, id: i64) {
        self.cache.remove(&id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
