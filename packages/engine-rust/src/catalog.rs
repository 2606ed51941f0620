//! In-memory catalog: the authoritative, ordered set of listings keyed by id.
//!
//! All mutations run under a single write lock, so readers see either the
//! catalog before a merge or after it, never a mix. Listings are shared as
//! `Arc<Listing>` so that views and favorites can hold them without copying.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use wishlist_core::Listing;

/// Outcome of [`CatalogStore::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Ids not previously present, appended in input order.
    pub inserted: usize,
    /// Existing ids whose record differed and was overwritten in place.
    pub updated: usize,
    /// Existing ids whose record was identical.
    pub unchanged: usize,
}

impl MergeReport {
    #[must_use]
    pub fn changed(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Listings plus the revision they were read at.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub revision: u64,
    pub listings: Vec<Arc<Listing>>,
}

#[derive(Debug, Default)]
struct CatalogInner {
    listings: Vec<Arc<Listing>>,
    positions: HashMap<i64, usize>,
    revision: u64,
}

impl CatalogInner {
    /// Inserts or overwrites. Returns `None` for an insert, otherwise whether
    /// the stored record changed.
    fn upsert(&mut self, listing: Listing) -> Option<bool> {
        if let Some(&pos) = self.positions.get(&listing.id) {
            if *self.listings[pos] == listing {
                return Some(false);
            }
            self.listings[pos] = Arc::new(listing);
            return Some(true);
        }
        self.positions.insert(listing.id, self.listings.len());
        self.listings.push(Arc::new(listing));
        None
    }
}

/// Single-writer, multi-reader listing set.
#[derive(Debug, Default)]
pub struct CatalogStore {
    inner: RwLock<CatalogInner>,
}

impl CatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole catalog. Later duplicates of an id overwrite earlier
    /// ones but keep the first position.
    pub fn replace_all(&self, listings: Vec<Listing>) {
        let mut fresh = CatalogInner::default();
        for listing in listings {
            fresh.upsert(listing);
        }
        let mut inner = self.inner.write();
        fresh.revision = inner.revision + 1;
        *inner = fresh;
    }

    /// Merges `incoming` by id: existing ids are overwritten in place, new ids
    /// are appended in input order.
    pub fn merge(&self, incoming: Vec<Listing>) -> MergeReport {
        let mut report = MergeReport::default();
        let mut inner = self.inner.write();
        for listing in incoming {
            match inner.upsert(listing) {
                None => report.inserted += 1,
                Some(true) => report.updated += 1,
                Some(false) => report.unchanged += 1,
            }
        }
        if report.changed() > 0 {
            inner.revision += 1;
        }
        report
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<Arc<Listing>> {
        let inner = self.inner.read();
        inner
            .positions
            .get(&id)
            .map(|&pos| Arc::clone(&inner.listings[pos]))
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.inner.read().positions.contains_key(&id)
    }

    /// All listings in catalog order.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<Listing>> {
        self.inner.read().listings.clone()
    }

    /// All listings together with the revision they belong to.
    #[must_use]
    pub fn snapshot(&self) -> CatalogSnapshot {
        let inner = self.inner.read();
        CatalogSnapshot {
            revision: inner.revision,
            listings: inner.listings.clone(),
        }
    }

    /// Owned copies, for writing a snapshot to disk.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Listing> {
        self.inner
            .read()
            .listings
            .iter()
            .map(|listing| Listing::clone(listing))
            .collect()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.read().listings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().listings.is_empty()
    }

    /// Bumped by every mutation that changes the catalog.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }
}
