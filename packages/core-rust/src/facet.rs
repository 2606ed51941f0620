//! Facet categories and per-value membership counts.
//!
//! A [`FacetIndex`] holds one counter map per [`FacetCategory`]. The master
//! index counts the whole catalog; a live index is seeded from the master with
//! [`FacetIndex::zero`] so that every value known to the catalog is present
//! (with count zero) even when the current filter excludes it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::listing::Listing;

/// Fixed display order of the price-range facet.
pub const PRICE_RANGE_ORDER: [&str; 6] = [
    "Free to start",
    "$0 - $4.99",
    "$5 - $9.99",
    "$10 - $19.99",
    "$20 - $39.99",
    "$40+",
];

/// Fixed display order of the ESRB facet.
pub const ESRB_ORDER: [&str; 5] = ["Everyone", "Everyone 10+", "Teen", "Mature", "Rating Pending"];

/// A dimension listings can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetCategory {
    General,
    Availability,
    Genres,
    PriceRange,
    Franchises,
    Players,
    EsrbRating,
}

impl FacetCategory {
    pub const ALL: [FacetCategory; 7] = [
        FacetCategory::General,
        FacetCategory::Availability,
        FacetCategory::Genres,
        FacetCategory::PriceRange,
        FacetCategory::Franchises,
        FacetCategory::Players,
        FacetCategory::EsrbRating,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FacetCategory::General => "general",
            FacetCategory::Availability => "availability",
            FacetCategory::Genres => "genres",
            FacetCategory::PriceRange => "priceRange",
            FacetCategory::Franchises => "franchises",
            FacetCategory::Players => "players",
            FacetCategory::EsrbRating => "esrbRating",
        }
    }

    /// Display order for categories with a fixed key list.
    #[must_use]
    pub fn fixed_order(self) -> Option<&'static [&'static str]> {
        match self {
            FacetCategory::PriceRange => Some(&PRICE_RANGE_ORDER),
            FacetCategory::EsrbRating => Some(&ESRB_ORDER),
            _ => None,
        }
    }

    /// Values `listing` contributes to this category.
    ///
    /// Price range yields nothing for unpriced listings.
    #[must_use]
    pub fn values_of(self, listing: &Listing) -> Vec<&str> {
        fn strs(values: &[String]) -> Vec<&str> {
            values.iter().map(String::as_str).collect()
        }
        match self {
            FacetCategory::General => strs(&listing.general_tags),
            FacetCategory::Availability => strs(&listing.availability),
            FacetCategory::Genres => strs(&listing.genres),
            FacetCategory::Franchises => strs(&listing.franchises),
            FacetCategory::Players => strs(&listing.player_tags),
            FacetCategory::PriceRange if listing.has_price => vec![listing.price_range_key()],
            FacetCategory::PriceRange => Vec::new(),
            FacetCategory::EsrbRating => vec![listing.esrb_rating.as_str()],
        }
    }

    /// Whether `listing` carries `value` in this category.
    #[must_use]
    pub fn matches(self, listing: &Listing, value: &str) -> bool {
        match self {
            FacetCategory::PriceRange => listing.price_range_key() == value,
            FacetCategory::EsrbRating => listing.esrb_rating == value,
            _ => self.values_of(listing).contains(&value),
        }
    }
}

impl fmt::Display for FacetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFacetCategory(pub String);

impl fmt::Display for UnknownFacetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown facet category: {}", self.0)
    }
}

impl std::error::Error for UnknownFacetCategory {}

impl FromStr for FacetCategory {
    type Err = UnknownFacetCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FacetCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownFacetCategory(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// FacetCounts
// ---------------------------------------------------------------------------

/// Counts for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetCounts {
    counts: BTreeMap<String, usize>,
    fixed_order: Option<&'static [&'static str]>,
}

impl FacetCounts {
    fn for_category(category: FacetCategory) -> Self {
        let fixed_order = category.fixed_order();
        let counts = fixed_order
            .unwrap_or_default()
            .iter()
            .map(|key| ((*key).to_string(), 0))
            .collect();
        Self {
            counts,
            fixed_order,
        }
    }

    fn increment(&mut self, value: &str) {
        if let Some(count) = self.counts.get_mut(value) {
            *count += 1;
        } else {
            self.counts.insert(value.to_string(), 1);
        }
    }

    #[must_use]
    pub fn get(&self, value: &str) -> usize {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// Sum over all values.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Keys in display order: the fixed list first (if any), then every other
    /// key alphabetically.
    #[must_use]
    pub fn ordered_keys(&self) -> Vec<&str> {
        match self.fixed_order {
            Some(fixed) => {
                let mut keys: Vec<&str> = fixed.to_vec();
                keys.extend(
                    self.counts
                        .keys()
                        .map(String::as_str)
                        .filter(|key| !fixed.iter().any(|fixed_key| fixed_key == key)),
                );
                keys
            }
            None => self.counts.keys().map(String::as_str).collect(),
        }
    }

    /// `(key, count)` pairs in display order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, usize)> {
        self.ordered_keys()
            .into_iter()
            .map(|key| (key, self.get(key)))
            .collect()
    }

    fn zeroed(&self) -> Self {
        Self {
            counts: self.counts.keys().map(|key| (key.clone(), 0)).collect(),
            fixed_order: self.fixed_order,
        }
    }
}

// ---------------------------------------------------------------------------
// FacetIndex
// ---------------------------------------------------------------------------

/// Counter maps for every category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetIndex {
    categories: BTreeMap<FacetCategory, FacetCounts>,
}

impl Default for FacetIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FacetIndex {
    /// Empty index; fixed-order categories start with all their keys at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            categories: FacetCategory::ALL
                .into_iter()
                .map(|c| (c, FacetCounts::for_category(c)))
                .collect(),
        }
    }

    /// Full rebuild over `listings`.
    #[must_use]
    pub fn build<'a, I>(listings: I) -> Self
    where
        I: IntoIterator<Item = &'a Listing>,
    {
        let mut index = Self::new();
        index.count_into(listings);
        index
    }

    /// Same key set with every count reset to zero.
    #[must_use]
    pub fn zero(&self) -> Self {
        Self {
            categories: self
                .categories
                .iter()
                .map(|(c, counts)| (*c, counts.zeroed()))
                .collect(),
        }
    }

    /// Adds the memberships of `listings` to this index.
    pub fn count_into<'a, I>(&mut self, listings: I)
    where
        I: IntoIterator<Item = &'a Listing>,
    {
        for listing in listings {
            self.count_listing(listing);
        }
    }

    pub fn count_listing(&mut self, listing: &Listing) {
        for (category, counts) in &mut self.categories {
            for value in category.values_of(listing) {
                counts.increment(value);
            }
        }
    }

    /// Counts for `category`.
    #[must_use]
    pub fn category(&self, category: FacetCategory) -> &FacetCounts {
        // Every category is inserted by `new`, and `zero` keeps the key set.
        &self.categories[&category]
    }

    #[must_use]
    pub fn get(&self, category: FacetCategory, value: &str) -> usize {
        self.category(category).get(value)
    }

    #[must_use]
    pub fn ordered_keys(&self, category: FacetCategory) -> Vec<&str> {
        self.category(category).ordered_keys()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::listing::tests::{arb_listing, listing};

    fn priced(id: i64, range: &str) -> Listing {
        let mut l = listing(id, "Priced");
        l.has_price = true;
        l.msrp = Some(9.99);
        l.price_range = Some(range.to_string());
        l
    }

    #[test]
    fn fixed_keys_present_with_zero_counts() {
        let index = FacetIndex::new();
        assert_eq!(index.ordered_keys(FacetCategory::PriceRange), PRICE_RANGE_ORDER.to_vec());
        assert_eq!(index.ordered_keys(FacetCategory::EsrbRating), ESRB_ORDER.to_vec());
        assert_eq!(index.get(FacetCategory::EsrbRating, "Teen"), 0);
        assert!(index.ordered_keys(FacetCategory::Genres).is_empty());
    }

    #[test]
    fn unpriced_listings_skip_price_range() {
        let mut unpriced = listing(1, "Demo");
        unpriced.price_range = Some("$0 - $4.99".to_string());
        let index = FacetIndex::build([&unpriced, &priced(2, "$0 - $4.99")]);
        assert_eq!(index.get(FacetCategory::PriceRange, "$0 - $4.99"), 1);
        assert_eq!(index.category(FacetCategory::EsrbRating).total(), 2);
    }

    #[test]
    fn unexpected_fixed_values_follow_fixed_keys() {
        let index = FacetIndex::build([&priced(1, "$100+")]);
        let keys = index.ordered_keys(FacetCategory::PriceRange);
        assert_eq!(keys.len(), PRICE_RANGE_ORDER.len() + 1);
        assert_eq!(keys.last(), Some(&"$100+"));
    }

    #[test]
    fn free_form_categories_sort_alphabetically() {
        let mut a = listing(1, "A");
        a.genres = vec!["Puzzle".to_string(), "Action".to_string()];
        let mut b = listing(2, "B");
        b.genres = vec!["Action".to_string()];
        let index = FacetIndex::build([&a, &b]);
        assert_eq!(index.ordered_keys(FacetCategory::Genres), vec!["Action", "Puzzle"]);
        assert_eq!(index.get(FacetCategory::Genres, "Action"), 2);
    }

    #[test]
    fn zero_keeps_keys_and_resets_counts() {
        let mut a = listing(1, "A");
        a.franchises = vec!["Zelda".to_string()];
        let master = FacetIndex::build([&a]);
        let live = master.zero();
        assert_eq!(live.ordered_keys(FacetCategory::Franchises), vec!["Zelda"]);
        assert_eq!(live.get(FacetCategory::Franchises, "Zelda"), 0);
    }

    #[test]
    fn category_parses_from_its_key() {
        for category in FacetCategory::ALL {
            assert_eq!(category.as_str().parse::<FacetCategory>(), Ok(category));
        }
        assert!("colour".parse::<FacetCategory>().is_err());
    }

    proptest! {
        #[test]
        fn facet_sums_match_memberships(listings in prop::collection::vec(arb_listing(), 0..20)) {
            let index = FacetIndex::build(&listings);

            let genres: usize = listings.iter().map(|l| l.genres.len()).sum();
            prop_assert_eq!(index.category(FacetCategory::Genres).total(), genres);

            let general: usize = listings.iter().map(|l| l.general_tags.len()).sum();
            prop_assert_eq!(index.category(FacetCategory::General).total(), general);

            prop_assert_eq!(index.category(FacetCategory::EsrbRating).total(), listings.len());

            let priced = listings.iter().filter(|l| l.has_price).count();
            prop_assert_eq!(index.category(FacetCategory::PriceRange).total(), priced);
        }
    }
}
