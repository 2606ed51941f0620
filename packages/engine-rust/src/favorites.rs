//! Ordered favorites list.
//!
//! The manager keeps the persisted id order and the listings those ids
//! resolve to in the current catalog. Commands return what changed; the
//! caller decides when to persist and notify.

use std::sync::Arc;

use wishlist_core::Listing;

use crate::catalog::CatalogStore;
use crate::error::FavoritesError;

/// Result of a favorites command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoritesChange {
    Added,
    Removed,
    Reordered,
    Unchanged,
}

impl FavoritesChange {
    #[must_use]
    pub fn is_change(self) -> bool {
        self != FavoritesChange::Unchanged
    }
}

/// Badge data: how many favorites there are and how many are on sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FavoritesSummary {
    pub count: usize,
    pub on_sale: usize,
}

#[derive(Debug, Default)]
pub struct FavoritesManager {
    ids: Vec<i64>,
    resolved: Vec<Arc<Listing>>,
}

impl FavoritesManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a persisted id list. Nothing is resolved until
    /// [`FavoritesManager::resolve`] runs.
    #[must_use]
    pub fn from_ids(ids: Vec<i64>) -> Self {
        let mut deduped = Vec::with_capacity(ids.len());
        for id in ids {
            if !deduped.contains(&id) {
                deduped.push(id);
            }
        }
        Self {
            ids: deduped,
            resolved: Vec::new(),
        }
    }

    /// Appends `listing`. Adding an id already present does nothing.
    pub fn add(&mut self, listing: Arc<Listing>) -> FavoritesChange {
        if self.contains(listing.id) {
            return FavoritesChange::Unchanged;
        }
        self.ids.push(listing.id);
        self.resolved.push(listing);
        FavoritesChange::Added
    }

    pub fn remove(&mut self, id: i64) -> FavoritesChange {
        let before = self.ids.len();
        self.ids.retain(|existing| *existing != id);
        self.resolved.retain(|listing| listing.id != id);
        if self.ids.len() == before {
            FavoritesChange::Unchanged
        } else {
            FavoritesChange::Removed
        }
    }

    /// Removes the favorite shown at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`FavoritesError::IndexOutOfRange`] if `index >= len()`.
    pub fn remove_at(&mut self, index: usize) -> Result<FavoritesChange, FavoritesError> {
        let id = self.check_index(index)?.id;
        Ok(self.remove(id))
    }

    /// Moves the favorite at `from` so that it ends up at `to`.
    ///
    /// # Errors
    ///
    /// Returns [`FavoritesError::IndexOutOfRange`] if either index is out of range.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<FavoritesChange, FavoritesError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(FavoritesChange::Unchanged);
        }
        let moved = self.resolved.remove(from);
        self.resolved.insert(to, moved);
        self.sync_ids_from_resolved();
        Ok(FavoritesChange::Reordered)
    }

    /// Re-resolves ids against `catalog`, keeping the relative order of the
    /// survivors and dropping ids the catalog no longer has. An empty catalog
    /// is treated as not loaded yet and drops nothing.
    ///
    /// Returns whether the id list shrank.
    pub fn resolve(&mut self, catalog: &CatalogStore) -> bool {
        if catalog.is_empty() {
            self.resolved.clear();
            return false;
        }
        self.resolved = self.ids.iter().filter_map(|id| catalog.get(*id)).collect();
        let pruned = self.resolved.len() != self.ids.len();
        self.sync_ids_from_resolved();
        pruned
    }

    fn sync_ids_from_resolved(&mut self) {
        self.ids = self.resolved.iter().map(|listing| listing.id).collect();
    }

    fn check_index(&self, index: usize) -> Result<&Arc<Listing>, FavoritesError> {
        self.resolved.get(index).ok_or(FavoritesError::IndexOutOfRange {
            index,
            len: self.resolved.len(),
        })
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Persisted order, including ids not resolved yet.
    #[must_use]
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Arc<Listing>> {
        self.resolved.get(index).cloned()
    }

    #[must_use]
    pub fn listings(&self) -> Vec<Arc<Listing>> {
        self.resolved.clone()
    }

    #[must_use]
    pub fn summary(&self) -> FavoritesSummary {
        FavoritesSummary {
            count: self.resolved.len(),
            on_sale: self.resolved.iter().filter(|l| l.on_sale).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::listing;

    fn catalog(ids: &[i64]) -> CatalogStore {
        let store = CatalogStore::new();
        store.replace_all(ids.iter().map(|id| listing(*id, "game")).collect());
        store
    }

    fn resolved_ids(manager: &FavoritesManager) -> Vec<i64> {
        manager.listings().iter().map(|l| l.id).collect()
    }

    #[test]
    fn orphans_are_dropped_on_resolve() {
        let store = catalog(&[2, 7]);
        let mut manager = FavoritesManager::from_ids(vec![7, 9, 2]);

        assert!(manager.resolve(&store));
        assert_eq!(resolved_ids(&manager), vec![7, 2]);
        assert_eq!(manager.ids(), &[7, 2]);
        assert!(!manager.resolve(&store));
    }

    #[test]
    fn empty_catalog_keeps_pending_ids() {
        let mut manager = FavoritesManager::from_ids(vec![7, 9]);
        assert!(!manager.resolve(&CatalogStore::new()));
        assert_eq!(manager.ids(), &[7, 9]);
        assert!(manager.is_empty());
    }

    #[test]
    fn add_is_idempotent() {
        let store = catalog(&[1, 2]);
        let mut manager = FavoritesManager::new();
        assert_eq!(manager.add(store.get(1).unwrap()), FavoritesChange::Added);
        assert_eq!(manager.add(store.get(1).unwrap()), FavoritesChange::Unchanged);
        assert_eq!(manager.ids(), &[1]);
        assert!(manager.contains(1));
        assert!(!manager.contains(2));
    }

    #[test]
    fn remove_and_remove_at() {
        let store = catalog(&[1, 2, 3]);
        let mut manager = FavoritesManager::from_ids(vec![1, 2, 3]);
        manager.resolve(&store);

        assert_eq!(manager.remove(2), FavoritesChange::Removed);
        assert_eq!(manager.remove(2), FavoritesChange::Unchanged);
        assert_eq!(manager.remove_at(1), Ok(FavoritesChange::Removed));
        assert_eq!(manager.ids(), &[1]);
        assert_eq!(
            manager.remove_at(5),
            Err(FavoritesError::IndexOutOfRange { index: 5, len: 1 })
        );
    }

    #[test]
    fn reorder_moves_entry() {
        let store = catalog(&[1, 2, 3, 4]);
        let mut manager = FavoritesManager::from_ids(vec![1, 2, 3, 4]);
        manager.resolve(&store);

        assert_eq!(manager.reorder(0, 2), Ok(FavoritesChange::Reordered));
        assert_eq!(manager.ids(), &[2, 3, 1, 4]);
        assert_eq!(resolved_ids(&manager), vec![2, 3, 1, 4]);

        assert_eq!(manager.reorder(3, 0), Ok(FavoritesChange::Reordered));
        assert_eq!(manager.ids(), &[4, 2, 3, 1]);

        assert_eq!(manager.reorder(1, 1), Ok(FavoritesChange::Unchanged));
        assert!(manager.reorder(0, 4).is_err());
    }

    #[test]
    fn summary_counts_on_sale() {
        let store = CatalogStore::new();
        let mut sale = listing(1, "sale");
        sale.on_sale = true;
        sale.sale_price = Some(1.0);
        store.replace_all(vec![sale, listing(2, "full price")]);

        let mut manager = FavoritesManager::from_ids(vec![1, 2]);
        manager.resolve(&store);
        assert_eq!(
            manager.summary(),
            FavoritesSummary {
                count: 2,
                on_sale: 1
            }
        );
    }

    #[test]
    fn duplicate_persisted_ids_collapse() {
        let manager = FavoritesManager::from_ids(vec![3, 3, 1]);
        assert_eq!(manager.ids(), &[3, 1]);
    }
}
