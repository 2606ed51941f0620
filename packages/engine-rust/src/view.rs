//! Filter → search → sort pipeline producing the displayed rows.
//!
//! Filtering is the expensive step and also drives the live facet counts, so
//! its output is cached together with the catalog and filter revisions it was
//! computed from. Search and sort always run on top of that cached subset.

use std::sync::Arc;

use wishlist_core::{ActiveFilterSet, FacetCategory, FacetIndex, Listing, SearchQuery, SortMode};

use crate::catalog::CatalogSnapshot;

#[derive(Debug)]
struct FilterCache {
    catalog_revision: u64,
    filter_revision: u64,
    filtered: Vec<Arc<Listing>>,
}

/// View state: active filters, search text, sort mode and derived results.
#[derive(Debug)]
pub struct ViewPipeline {
    filters: ActiveFilterSet,
    filter_revision: u64,
    search: Option<SearchQuery>,
    sort: SortMode,
    cache: Option<FilterCache>,
    live_facets: Arc<FacetIndex>,
}

impl Default for ViewPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: ActiveFilterSet::new(),
            filter_revision: 0,
            search: None,
            sort: SortMode::default(),
            cache: None,
            live_facets: Arc::new(FacetIndex::new()),
        }
    }

    // -- State ---------------------------------------------------------------

    /// Selects or deselects a facet value. Returns whether the filters changed.
    pub fn set_filter(&mut self, category: FacetCategory, value: &str, selected: bool) -> bool {
        let changed = self.filters.set(category, value, selected);
        if changed {
            self.filter_revision += 1;
        }
        changed
    }

    /// Returns whether any filter was active.
    pub fn clear_filters(&mut self) -> bool {
        let changed = self.filters.clear();
        if changed {
            self.filter_revision += 1;
        }
        changed
    }

    /// Returns whether the mode changed.
    pub fn set_sort(&mut self, mode: SortMode) -> bool {
        let changed = self.sort != mode;
        self.sort = mode;
        changed
    }

    /// Sets the title search. Empty text clears it. Returns whether it changed.
    pub fn set_search(&mut self, text: &str) -> bool {
        let query = SearchQuery::new(text);
        let changed = self.search != query;
        self.search = query;
        changed
    }

    #[must_use]
    pub fn filters(&self) -> &ActiveFilterSet {
        &self.filters
    }

    #[must_use]
    pub fn sort(&self) -> SortMode {
        self.sort
    }

    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.search.as_ref().map(SearchQuery::text)
    }

    /// Facet counts over the filtered, unsearched subset.
    #[must_use]
    pub fn live_facets(&self) -> Arc<FacetIndex> {
        Arc::clone(&self.live_facets)
    }

    // -- Apply ---------------------------------------------------------------

    /// Computes the displayed rows.
    ///
    /// With `skip_refilter`, the cached filtered subset is reused when it was
    /// built from the same catalog and filter revisions; otherwise the filter
    /// runs again and the live facets are recounted, seeded from `master`.
    pub fn apply(
        &mut self,
        catalog: &CatalogSnapshot,
        master: &FacetIndex,
        skip_refilter: bool,
    ) -> Vec<Arc<Listing>> {
        let fresh = self.cache.as_ref().is_some_and(|cache| {
            cache.catalog_revision == catalog.revision
                && cache.filter_revision == self.filter_revision
        });

        if !(skip_refilter && fresh) {
            let filtered = self.filters.apply(catalog.listings.iter().cloned());
            let mut live = master.zero();
            live.count_into(filtered.iter().map(AsRef::as_ref));
            self.live_facets = Arc::new(live);
            self.cache = Some(FilterCache {
                catalog_revision: catalog.revision,
                filter_revision: self.filter_revision,
                filtered,
            });
        }

        let filtered = self
            .cache
            .as_ref()
            .map(|cache| cache.filtered.as_slice())
            .unwrap_or_default();
        let mut rows: Vec<Arc<Listing>> = match &self.search {
            Some(query) => filtered
                .iter()
                .filter(|listing| query.matches(listing))
                .cloned()
                .collect(),
            None => filtered.to_vec(),
        };
        self.sort.sort(&mut rows);
        rows
    }
}
