//! Wishlist Core — listing records, attribute envelopes, facet counts, filters and sorting.

pub mod details;
pub mod facet;
pub mod filter;
pub mod listing;
pub mod sort;
pub mod wire;

pub use details::{decode_details, Details};
pub use facet::{FacetCategory, FacetCounts, FacetIndex};
pub use filter::{ActiveFilterSet, SearchQuery};
pub use listing::{decode_items, decode_listing, DecodedBatch, Listing, ListingInput};
pub use sort::SortMode;
pub use wire::{ContinuationKey, DetailsPage, UpdatePage, WireDetails, WireListing};
