//! Active facet filters and title search.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::facet::FacetCategory;
use crate::listing::Listing;

/// Selected facet values. Values within a category are OR-ed, categories are
/// AND-ed; an empty set restricts nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFilterSet {
    selected: BTreeMap<FacetCategory, BTreeSet<String>>,
}

impl ActiveFilterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects or deselects `value`. Returns whether the set changed.
    pub fn set(&mut self, category: FacetCategory, value: &str, selected: bool) -> bool {
        if selected {
            return self
                .selected
                .entry(category)
                .or_default()
                .insert(value.to_string());
        }
        let Some(values) = self.selected.get_mut(&category) else {
            return false;
        };
        let removed = values.remove(value);
        if values.is_empty() {
            self.selected.remove(&category);
        }
        removed
    }

    /// Removes every selection. Returns whether anything was selected.
    pub fn clear(&mut self) -> bool {
        let had_any = !self.selected.is_empty();
        self.selected.clear();
        had_any
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    #[must_use]
    pub fn is_active(&self, category: FacetCategory, value: &str) -> bool {
        self.selected
            .get(&category)
            .is_some_and(|values| values.contains(value))
    }

    /// Total number of selected values across all categories.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.selected.values().map(BTreeSet::len).sum()
    }

    /// Categories with at least one selected value.
    pub fn categories(&self) -> impl Iterator<Item = FacetCategory> + '_ {
        self.selected.keys().copied()
    }

    pub fn values(&self, category: FacetCategory) -> impl Iterator<Item = &str> {
        self.selected
            .get(&category)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    #[must_use]
    pub fn matches(&self, listing: &Listing) -> bool {
        self.selected.iter().all(|(category, values)| {
            values
                .iter()
                .any(|value| category.matches(listing, value))
        })
    }

    /// Keeps the listings that satisfy every active category, in input order.
    pub fn apply<L, I>(&self, listings: I) -> Vec<L>
    where
        L: AsRef<Listing>,
        I: IntoIterator<Item = L>,
    {
        listings
            .into_iter()
            .filter(|listing| self.matches(listing.as_ref()))
            .collect()
    }
}

/// Case-insensitive substring match on titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    needle: String,
}

impl SearchQuery {
    /// Returns `None` for empty text, which means "no search".
    #[must_use]
    pub fn new(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            needle: text.to_lowercase(),
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn matches(&self, listing: &Listing) -> bool {
        listing.title.to_lowercase().contains(&self.needle)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::listing::tests::{arb_listing, listing};
    use crate::listing::FEATURED_TAG;

    fn tagged(id: i64, title: &str, general: &[&str], genres: &[&str]) -> Listing {
        let mut l = listing(id, title);
        l.general_tags = general.iter().map(|s| (*s).to_string()).collect();
        l.genres = genres.iter().map(|s| (*s).to_string()).collect();
        l
    }

    #[test]
    fn empty_set_matches_everything() {
        let filters = ActiveFilterSet::new();
        assert!(filters.matches(&listing(1, "Anything")));
        assert_eq!(filters.active_count(), 0);
    }

    #[test]
    fn set_reports_changes_and_drops_empty_categories() {
        let mut filters = ActiveFilterSet::new();
        assert!(filters.set(FacetCategory::Genres, "RPG", true));
        assert!(!filters.set(FacetCategory::Genres, "RPG", true));
        assert!(filters.set(FacetCategory::Genres, "Action", true));
        assert_eq!(filters.active_count(), 2);

        assert!(filters.set(FacetCategory::Genres, "RPG", false));
        assert!(filters.set(FacetCategory::Genres, "Action", false));
        assert!(!filters.set(FacetCategory::Genres, "Action", false));
        assert!(filters.is_empty());
        assert_eq!(filters.categories().count(), 0);
    }

    #[test]
    fn or_within_and_across_categories() {
        let a = tagged(1, "A", &[FEATURED_TAG], &["RPG"]);
        let b = tagged(2, "B", &[], &["Action"]);
        let c = tagged(3, "C", &[FEATURED_TAG], &["Puzzle"]);

        let mut filters = ActiveFilterSet::new();
        filters.set(FacetCategory::Genres, "RPG", true);
        filters.set(FacetCategory::Genres, "Action", true);
        let ids: Vec<i64> = filters.apply([&a, &b, &c]).iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2]);

        filters.set(FacetCategory::General, FEATURED_TAG, true);
        let ids: Vec<i64> = filters.apply([&a, &b, &c]).iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn price_range_filter_uses_unknown_key() {
        let mut l = listing(1, "Unlabelled");
        l.has_price = true;
        let mut filters = ActiveFilterSet::new();
        filters.set(FacetCategory::PriceRange, "N/A", true);
        assert!(filters.matches(&l));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let query = SearchQuery::new("zeLDa").unwrap();
        assert!(query.matches(&listing(1, "The Legend of Zelda")));
        assert!(!query.matches(&listing(2, "Metroid Dread")));
        assert!(SearchQuery::new("").is_none());
    }

    proptest! {
        #[test]
        fn filter_output_satisfies_every_category(
            listings in prop::collection::vec(arb_listing(), 0..20),
            pick in any::<prop::sample::Index>(),
        ) {
            let mut filters = ActiveFilterSet::new();
            if let Some(source) = listings.get(pick.index(listings.len().max(1))) {
                if let Some(genre) = source.genres.first() {
                    filters.set(FacetCategory::Genres, genre, true);
                }
                filters.set(FacetCategory::EsrbRating, &source.esrb_rating, true);
            }

            let kept = filters.apply(&listings);
            for listing in &kept {
                for category in filters.categories() {
                    prop_assert!(filters
                        .values(category)
                        .any(|value| category.matches(listing, value)));
                }
            }
            let expected = listings.iter().filter(|l| filters.matches(l)).count();
            prop_assert_eq!(kept.len(), expected);
        }
    }
}
