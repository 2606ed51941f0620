//! Composition root: wires the catalog, sync engine, view pipeline, favorites,
//! details cache and local store behind one handle.
//!
//! Readers of the displayed rows and the master facets go through `ArcSwap`
//! snapshots and never block on a sync. Commands that change the view or the
//! favorites take a short `parking_lot` lock, recompute, and swap the result.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wishlist_core::{
    ActiveFilterSet, Details, FacetCategory, FacetIndex, Listing, ListingInput, SortMode,
};

use crate::catalog::CatalogStore;
use crate::config::EngineConfig;
use crate::details::DetailsCache;
use crate::error::{FavoritesError, SyncError};
use crate::favorites::{FavoritesChange, FavoritesManager, FavoritesSummary};
use crate::source::{HttpListingSource, ListingSource};
use crate::store::{self, FileStore, LocalStore};
use crate::sync::{CatalogChange, CatalogObserver, SyncEngine, SyncReport};
use crate::view::ViewPipeline;

// ---------------------------------------------------------------------------
// Derived state
// ---------------------------------------------------------------------------

/// Everything computed from the catalog: master facets, the view and the
/// resolved favorites.
struct DerivedState {
    store: Arc<dyn LocalStore>,
    master_facets: ArcSwap<FacetIndex>,
    rows: ArcSwap<Vec<Arc<Listing>>>,
    view: Mutex<ViewPipeline>,
    favorites: Mutex<FavoritesManager>,
    favorites_tx: watch::Sender<FavoritesSummary>,
}

impl DerivedState {
    /// Recomputes the rows. Catalog and master facets are read under the view
    /// lock, so rows are published in catalog order.
    fn refresh_view(&self, catalog: &CatalogStore, skip_refilter: bool) {
        let mut view = self.view.lock();
        let snapshot = catalog.snapshot();
        let master = self.master_facets.load();
        let rows = view.apply(&snapshot, &master, skip_refilter);
        self.rows.store(Arc::new(rows));
    }

    fn persist_favorites(&self, manager: &FavoritesManager) {
        if let Err(err) = store::store_favorites(self.store.as_ref(), manager.ids()) {
            warn!(error = %err, "failed to persist favorites");
        }
    }

    fn publish_favorites(&self, manager: &FavoritesManager) {
        self.favorites_tx.send_replace(manager.summary());
    }
}

impl CatalogObserver for DerivedState {
    fn on_catalog_changed(&self, catalog: &CatalogStore, change: CatalogChange) {
        let listings = catalog.all();
        let master = FacetIndex::build(listings.iter().map(AsRef::as_ref));
        self.master_facets.store(Arc::new(master));
        self.refresh_view(catalog, false);

        let mut favorites = self.favorites.lock();
        if favorites.resolve(catalog) {
            debug!(remaining = favorites.len(), "dropped favorites missing from catalog");
            self.persist_favorites(&favorites);
        }
        self.publish_favorites(&favorites);
        debug!(?change, count = listings.len(), "derived state rebuilt");
    }
}

// ---------------------------------------------------------------------------
// CatalogService
// ---------------------------------------------------------------------------

pub struct CatalogService {
    config: EngineConfig,
    catalog: Arc<CatalogStore>,
    store: Arc<dyn LocalStore>,
    source: Arc<dyn ListingSource>,
    derived: Arc<DerivedState>,
    engine: SyncEngine,
    details: DetailsCache,
}

impl CatalogService {
    /// Builds a service over the given source and store. Persisted favorites
    /// are loaded immediately; the catalog starts empty.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn ListingSource>,
        store: Arc<dyn LocalStore>,
    ) -> Self {
        let favorite_ids = store::load_favorites(store.as_ref()).unwrap_or_else(|err| {
            warn!(error = %err, "failed to load favorites; starting empty");
            Vec::new()
        });
        let favorites = FavoritesManager::from_ids(favorite_ids);
        let (favorites_tx, _rx) = watch::channel(favorites.summary());

        let catalog = Arc::new(CatalogStore::new());
        let derived = Arc::new(DerivedState {
            store: Arc::clone(&store),
            master_facets: ArcSwap::from_pointee(FacetIndex::new()),
            rows: ArcSwap::from_pointee(Vec::new()),
            view: Mutex::new(ViewPipeline::new()),
            favorites: Mutex::new(favorites),
            favorites_tx,
        });
        let engine = SyncEngine::new(
            Arc::clone(&source),
            Arc::clone(&store),
            Arc::clone(&catalog),
            derived.clone(),
            config.max_pages,
        );
        let details = DetailsCache::new(config.details_cache_capacity);

        Self {
            config,
            catalog,
            store,
            source,
            derived,
            engine,
            details,
        }
    }

    /// Builds a service backed by the HTTP API and a [`FileStore`] in
    /// `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RequestConstructionFailed`] if the API base URL is invalid.
    pub fn from_config(config: EngineConfig) -> Result<Self, SyncError> {
        let source = HttpListingSource::new(&config.api_base_url, config.request_timeout)?;
        let store = FileStore::new(config.data_dir.clone());
        Ok(Self::new(config, Arc::new(source), Arc::new(store)))
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- Catalog -------------------------------------------------------------

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.catalog.count()
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.engine.is_syncing()
    }

    /// Loads the catalog from the local snapshot. Returns `Ok(false)` when no
    /// snapshot exists.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SyncAlreadyInProgress`] while a sync runs, or
    /// [`SyncError::LocalStoreReadFailed`] if the snapshot cannot be read.
    pub fn read_local_snapshot(&self) -> Result<bool, SyncError> {
        let _guard = self.engine.try_acquire()?;
        let Some(stored) = self
            .store
            .load_snapshot()
            .map_err(SyncError::LocalStoreReadFailed)?
        else {
            return Ok(false);
        };

        let listings: Vec<Listing> = stored
            .into_iter()
            .filter_map(|listing| Listing::from_input(ListingInput::Decoded(listing)))
            .collect();
        let count = listings.len();
        self.catalog.replace_all(listings);
        self.derived
            .on_catalog_changed(&self.catalog, CatalogChange::Restored { count });
        info!(count, "catalog restored from snapshot");
        Ok(true)
    }

    /// Writes the current catalog to the local snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LocalStoreWriteFailed`] if the write fails.
    pub fn save_local_snapshot(&self) -> Result<(), SyncError> {
        self.store
            .save_snapshot(&self.catalog.to_vec())
            .map_err(SyncError::LocalStoreWriteFailed)
    }

    /// # Errors
    ///
    /// See [`SyncEngine::sync`].
    pub async fn sync(&self, full_refresh: bool) -> Result<SyncReport, SyncError> {
        self.engine.sync(full_refresh).await
    }

    /// # Errors
    ///
    /// See [`SyncEngine::sync_with_timeout`].
    pub async fn sync_with_timeout(
        &self,
        full_refresh: bool,
        timeout: Duration,
    ) -> Result<SyncReport, SyncError> {
        self.engine.sync_with_timeout(full_refresh, timeout).await
    }

    /// # Errors
    ///
    /// See [`SyncEngine::sync_cancellable`].
    pub async fn sync_cancellable(
        &self,
        full_refresh: bool,
        token: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        self.engine.sync_cancellable(full_refresh, token).await
    }

    /// Watermark stored by the last sync that fetched records.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LocalStoreReadFailed`] if the setting cannot be read.
    pub fn last_watermark(&self) -> Result<Option<i64>, SyncError> {
        store::load_watermark(self.store.as_ref()).map_err(SyncError::LocalStoreReadFailed)
    }

    // -- Rows ----------------------------------------------------------------

    #[must_use]
    pub fn rows(&self) -> Arc<Vec<Arc<Listing>>> {
        self.derived.rows.load_full()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.derived.rows.load().len()
    }

    #[must_use]
    pub fn row_at(&self, index: usize) -> Option<Arc<Listing>> {
        self.derived.rows.load().get(index).cloned()
    }

    // -- Filters, search, sort -----------------------------------------------

    /// Selects or deselects a facet value and re-applies the view when the
    /// selection changed.
    pub fn set_filter(&self, category: FacetCategory, value: &str, selected: bool) -> bool {
        let changed = self
            .derived
            .view
            .lock()
            .set_filter(category, value, selected);
        if changed {
            self.derived.refresh_view(&self.catalog, false);
        }
        changed
    }

    pub fn clear_filters(&self) -> bool {
        let changed = self.derived.view.lock().clear_filters();
        if changed {
            self.derived.refresh_view(&self.catalog, false);
        }
        changed
    }

    #[must_use]
    pub fn active_filters(&self) -> ActiveFilterSet {
        self.derived.view.lock().filters().clone()
    }

    #[must_use]
    pub fn active_filter_count(&self) -> usize {
        self.derived.view.lock().filters().active_count()
    }

    #[must_use]
    pub fn is_filter_active(&self, category: FacetCategory, value: &str) -> bool {
        self.derived.view.lock().filters().is_active(category, value)
    }

    /// Counts over the filtered subset, search excluded.
    #[must_use]
    pub fn live_facets(&self) -> Arc<FacetIndex> {
        self.derived.view.lock().live_facets()
    }

    #[must_use]
    pub fn master_facets(&self) -> Arc<FacetIndex> {
        self.derived.master_facets.load_full()
    }

    /// Returns whether the mode changed. Re-sorting reuses the filtered subset.
    pub fn set_sort(&self, mode: SortMode) -> bool {
        let changed = self.derived.view.lock().set_sort(mode);
        if changed {
            self.derived.refresh_view(&self.catalog, true);
        }
        changed
    }

    #[must_use]
    pub fn sort(&self) -> SortMode {
        self.derived.view.lock().sort()
    }

    /// Sets the title search; empty text clears it.
    pub fn search(&self, text: &str) -> bool {
        let changed = self.derived.view.lock().set_search(text);
        if changed {
            self.derived.refresh_view(&self.catalog, true);
        }
        changed
    }

    // -- Favorites -----------------------------------------------------------

    fn apply_favorites<T>(
        &self,
        command: impl FnOnce(&mut FavoritesManager) -> Result<T, FavoritesError>,
        changed: impl Fn(&T) -> bool,
    ) -> Result<T, FavoritesError> {
        let mut favorites = self.derived.favorites.lock();
        let outcome = command(&mut favorites)?;
        if changed(&outcome) {
            self.derived.persist_favorites(&favorites);
            self.derived.publish_favorites(&favorites);
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns [`FavoritesError::UnknownListing`] if `id` is not in the catalog.
    pub fn add_favorite(&self, id: i64) -> Result<FavoritesChange, FavoritesError> {
        // Lookup and insert happen under the same favorites lock as resolve.
        self.apply_favorites(
            |favorites| {
                let listing = self
                    .catalog
                    .get(id)
                    .ok_or(FavoritesError::UnknownListing { id })?;
                Ok(favorites.add(listing))
            },
            |change| change.is_change(),
        )
    }

    pub fn remove_favorite(&self, id: i64) -> FavoritesChange {
        let mut favorites = self.derived.favorites.lock();
        let change = favorites.remove(id);
        if change.is_change() {
            self.derived.persist_favorites(&favorites);
            self.derived.publish_favorites(&favorites);
        }
        change
    }

    /// # Errors
    ///
    /// Returns [`FavoritesError::IndexOutOfRange`] for an invalid index.
    pub fn remove_favorite_at(&self, index: usize) -> Result<FavoritesChange, FavoritesError> {
        self.apply_favorites(|f| f.remove_at(index), |c| c.is_change())
    }

    /// # Errors
    ///
    /// Returns [`FavoritesError::IndexOutOfRange`] for an invalid index.
    pub fn reorder_favorites(
        &self,
        from: usize,
        to: usize,
    ) -> Result<FavoritesChange, FavoritesError> {
        self.apply_favorites(|f| f.reorder(from, to), |c| c.is_change())
    }

    #[must_use]
    pub fn is_favorited(&self, id: i64) -> bool {
        self.derived.favorites.lock().contains(id)
    }

    #[must_use]
    pub fn favorites_count(&self) -> usize {
        self.derived.favorites.lock().len()
    }

    #[must_use]
    pub fn favorite_at(&self, index: usize) -> Option<Arc<Listing>> {
        self.derived.favorites.lock().get(index)
    }

    #[must_use]
    pub fn favorites(&self) -> Vec<Arc<Listing>> {
        self.derived.favorites.lock().listings()
    }

    #[must_use]
    pub fn favorites_summary(&self) -> FavoritesSummary {
        *self.derived.favorites_tx.borrow()
    }

    /// Receiver notified whenever the favorites summary is republished.
    #[must_use]
    pub fn subscribe_favorites(&self) -> watch::Receiver<FavoritesSummary> {
        self.derived.favorites_tx.subscribe()
    }

    // -- Details -------------------------------------------------------------

    /// Full record for `id`, served from the cache when possible.
    ///
    /// # Errors
    ///
    /// Propagates fetch and decode failures.
    pub async fn details(&self, id: i64) -> Result<Option<Arc<Details>>, SyncError> {
        self.details.fetch(self.source.as_ref(), id).await
    }

    /// Absolute box art URL for `listing`.
    #[must_use]
    pub fn box_art_url(&self, listing: &Listing) -> String {
        listing.box_art_url(&self.config.site_base_url)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
