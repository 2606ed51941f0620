//! Sort orders for the catalog view.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::listing::Listing;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortMode {
    /// Featured listings first, input order kept within each group.
    #[default]
    Featured,
    /// Newest first, compared on the raw release-date text.
    ReleaseDate,
    #[serde(rename = "titleAtoZ")]
    TitleAscending,
    #[serde(rename = "titleZtoA")]
    TitleDescending,
    PriceAscending,
    PriceDescending,
}

impl SortMode {
    pub const ALL: [SortMode; 6] = [
        SortMode::Featured,
        SortMode::ReleaseDate,
        SortMode::TitleAscending,
        SortMode::TitleDescending,
        SortMode::PriceAscending,
        SortMode::PriceDescending,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            SortMode::Featured => "featured",
            SortMode::ReleaseDate => "releaseDate",
            SortMode::TitleAscending => "titleAtoZ",
            SortMode::TitleDescending => "titleZtoA",
            SortMode::PriceAscending => "priceAscending",
            SortMode::PriceDescending => "priceDescending",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SortMode::Featured => "Featured",
            SortMode::ReleaseDate => "Release Date",
            SortMode::TitleAscending => "Title (A to Z)",
            SortMode::TitleDescending => "Title (Z to A)",
            SortMode::PriceAscending => "Price (Low to High)",
            SortMode::PriceDescending => "Price (High to Low)",
        }
    }

    /// Sorts in place. Every mode is a stable sort.
    pub fn sort<L: AsRef<Listing>>(self, listings: &mut [L]) {
        match self {
            SortMode::Featured => listings.sort_by_key(|l| !l.as_ref().featured),
            SortMode::ReleaseDate => listings.sort_by(|a, b| {
                b.as_ref()
                    .release_date_raw
                    .cmp(&a.as_ref().release_date_raw)
            }),
            SortMode::TitleAscending => {
                listings.sort_by(|a, b| a.as_ref().title.cmp(&b.as_ref().title));
            }
            SortMode::TitleDescending => {
                listings.sort_by(|a, b| b.as_ref().title.cmp(&a.as_ref().title));
            }
            SortMode::PriceAscending => {
                listings.sort_by_key(|l| l.as_ref().ascending_sort_price());
            }
            SortMode::PriceDescending => {
                listings.sort_by_key(|l| Reverse(l.as_ref().descending_sort_price()));
            }
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortMode(pub String);

impl fmt::Display for UnknownSortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sort mode: {}", self.0)
    }
}

impl std::error::Error for UnknownSortMode {}

impl FromStr for SortMode {
    type Err = UnknownSortMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortMode::ALL
            .into_iter()
            .find(|mode| mode.key() == s)
            .ok_or_else(|| UnknownSortMode(s.to_string()))
    }
}
