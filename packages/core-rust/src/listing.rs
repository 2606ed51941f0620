//! Listing record: the summary form of a catalog entry.
//!
//! A [`Listing`] is produced either from a [`WireListing`] served by the update
//! feed or restored as-is from a local snapshot. Both paths go through
//! [`Listing::from_input`], so the id check is applied uniformly.

use chrono::{DateTime, NaiveDateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::wire::{
    self, AttrBool, AttrList, AttrNullableNumber, AttrNullableString, AttrNumber, AttrString,
    WireListing,
};

/// Default for title, platform and ESRB rating when the attribute is absent.
pub const NOT_AVAILABLE: &str = "Not available";

/// Facet key used for a priced listing with no price-range label.
pub const PRICE_RANGE_UNKNOWN: &str = "N/A";

/// Tag injected into `general_tags` for featured listings.
pub const FEATURED_TAG: &str = "Featured";

/// `last_modified` assumed when the feed omits it.
pub const DEFAULT_LAST_MODIFIED: i64 = 1;

const AVAILABLE_NOW: &str = "Available now";
const AVAILABLE_PREFIX: &str = "Available ";
const CHECK_LATER: &str = "Check later for availability";

/// One catalog entry in summary form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: i64,
    pub title: String,
    pub platform: String,
    pub genres: Vec<String>,
    pub franchises: Vec<String>,
    pub availability: Vec<String>,
    pub player_tags: Vec<String>,
    pub general_tags: Vec<String>,
    pub price_range: Option<String>,
    pub msrp: Option<f64>,
    pub sale_price: Option<f64>,
    pub on_sale: bool,
    pub has_price: bool,
    pub featured: bool,
    pub esrb_rating: String,
    pub box_art_path: String,
    pub release_date_raw: String,
    pub last_modified: i64,
}

/// Either form a listing can be constructed from.
#[derive(Debug, Clone)]
pub enum ListingInput {
    /// Attribute-envelope record from the remote feed.
    Wire(WireListing),
    /// Already-decoded record, e.g. from a local snapshot.
    Decoded(Listing),
}

/// Normalizes general tags: any wire-supplied `Featured` entry is dropped and
/// a single one is appended when `featured` is set.
pub(crate) fn normalize_general_tags(mut tags: Vec<String>, featured: bool) -> Vec<String> {
    tags.retain(|tag| tag != FEATURED_TAG);
    if featured {
        tags.push(FEATURED_TAG.to_string());
    }
    tags
}

/// Shared price decoding for listings and details: `(msrp, has_price, sale_price, on_sale)`.
pub(crate) fn decode_prices(
    msrp: Option<&AttrNullableNumber>,
    sale: Option<&AttrNullableNumber>,
) -> (Option<f64>, bool, Option<f64>, bool) {
    // The null marker has to be checked before any numeric parse.
    let has_price = !msrp.is_some_and(AttrNullableNumber::is_null);
    let msrp = if has_price {
        wire::unpack_price(msrp)
    } else {
        None
    };
    let sale_price = wire::unpack_price(sale);
    (msrp, has_price, sale_price, sale_price.is_some())
}

/// Decodes a wire record. Returns `None` only when the id is missing or
/// unparseable.
pub fn decode_listing(raw: &WireListing) -> Option<Listing> {
    let Some(id) = wire::unpack_id(raw.nsuid.as_ref()) else {
        warn!(
            title = raw.title.as_ref().and_then(|t| t.s.as_deref()).unwrap_or("nil"),
            "dropping listing without usable id"
        );
        return None;
    };

    let featured = wire::unpack_bool(raw.featured.as_ref(), false);
    let (msrp, has_price, sale_price, on_sale) =
        decode_prices(raw.msrp.as_ref(), raw.sale_price.as_ref());

    Some(Listing {
        id,
        title: wire::unpack_string(raw.title.as_ref(), NOT_AVAILABLE),
        platform: wire::unpack_string(raw.platform.as_ref(), NOT_AVAILABLE),
        genres: wire::unpack_list(raw.genres.as_ref()),
        franchises: wire::unpack_list(raw.franchises.as_ref()),
        availability: wire::unpack_list(raw.availability.as_ref()),
        player_tags: wire::unpack_list(raw.player_filters.as_ref()),
        general_tags: normalize_general_tags(
            wire::unpack_list(raw.general_filters.as_ref()),
            featured,
        ),
        price_range: wire::unpack_nullable_string(raw.price_range.as_ref()),
        msrp,
        sale_price,
        on_sale,
        has_price,
        featured,
        esrb_rating: wire::unpack_string(raw.esrb_rating.as_ref(), NOT_AVAILABLE),
        box_art_path: wire::unpack_string(raw.boxart.as_ref(), ""),
        release_date_raw: wire::unpack_string(raw.release_date_display.as_ref(), ""),
        last_modified: wire::unpack_i64(raw.last_modified.as_ref(), DEFAULT_LAST_MODIFIED),
    })
}

/// Listings decoded from a page of raw items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBatch {
    pub listings: Vec<Listing>,
    /// Items that were not a record object or had no usable id.
    pub skipped: usize,
}

/// Decodes every item of a page. A malformed item is logged and skipped; it
/// never fails the batch.
pub fn decode_items(items: &[serde_json::Value]) -> DecodedBatch {
    let mut batch = DecodedBatch {
        listings: Vec::with_capacity(items.len()),
        skipped: 0,
    };
    for item in items {
        let decoded = match WireListing::deserialize(item) {
            Ok(raw) => decode_listing(&raw),
            Err(err) => {
                warn!(error = %err, "dropping malformed listing item");
                None
            }
        };
        match decoded {
            Some(listing) => batch.listings.push(listing),
            None => batch.skipped += 1,
        }
    }
    batch
}

/// Parses a release date in either `2018-01-11T00:00:00.000Z` or
/// `2017-11-16T00:00:00.000-08:00` form.
pub fn parse_release_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl Listing {
    /// Builds a listing from either input form.
    #[must_use]
    pub fn from_input(input: ListingInput) -> Option<Self> {
        match input {
            ListingInput::Wire(raw) => decode_listing(&raw),
            ListingInput::Decoded(listing) if listing.id != 0 => Some(listing),
            ListingInput::Decoded(listing) => {
                warn!(title = %listing.title, "dropping restored listing with id 0");
                None
            }
        }
    }

    /// Re-encodes into the attribute-envelope form. The synthetic `Featured`
    /// tag is stripped, so decoding the result yields an equal listing.
    #[must_use]
    pub fn to_wire(&self) -> WireListing {
        let general: Vec<&str> = self
            .general_tags
            .iter()
            .map(String::as_str)
            .filter(|tag| *tag != FEATURED_TAG)
            .collect();

        let msrp = if !self.has_price {
            AttrNullableNumber::null()
        } else if let Some(value) = self.msrp {
            AttrNullableNumber::number(value)
        } else {
            AttrNullableNumber::default()
        };

        WireListing {
            nsuid: Some(AttrString::new(self.id.to_string())),
            title: Some(AttrString::new(&self.title)),
            platform: Some(AttrString::new(&self.platform)),
            genres: Some(AttrList::from_strings(&self.genres)),
            franchises: Some(AttrList::from_strings(&self.franchises)),
            availability: Some(AttrList::from_strings(&self.availability)),
            player_filters: Some(AttrList::from_strings(&self.player_tags)),
            general_filters: Some(AttrList::from_strings(general)),
            price_range: Some(
                self.price_range
                    .as_ref()
                    .map_or_else(AttrNullableString::null, AttrNullableString::new),
            ),
            msrp: Some(msrp),
            sale_price: Some(
                self.sale_price
                    .map_or_else(AttrNullableNumber::null, AttrNullableNumber::number),
            ),
            featured: Some(AttrBool::new(self.featured)),
            esrb_rating: Some(AttrString::new(&self.esrb_rating)),
            boxart: Some(AttrString::new(&self.box_art_path)),
            release_date_display: Some(AttrString::new(&self.release_date_raw)),
            last_modified: Some(AttrNumber::from_i64(self.last_modified)),
        }
    }

    /// Key under which the listing is counted in the price-range facet.
    #[must_use]
    pub fn price_range_key(&self) -> &str {
        self.price_range.as_deref().unwrap_or(PRICE_RANGE_UNKNOWN)
    }

    /// Price the listing is currently sold at, if any.
    #[must_use]
    pub fn active_price(&self) -> Option<f64> {
        if !self.has_price {
            return None;
        }
        if self.on_sale {
            self.sale_price
        } else {
            self.msrp
        }
    }

    /// Sort key for ascending price order; unpriced listings sort last.
    #[must_use]
    pub fn ascending_sort_price(&self) -> OrderedFloat<f64> {
        self.sort_price()
    }

    /// Sort key for descending price order. Unpriced listings carry the
    /// largest key, so they lead a descending sort.
    #[must_use]
    pub fn descending_sort_price(&self) -> OrderedFloat<f64> {
        self.sort_price()
    }

    fn sort_price(&self) -> OrderedFloat<f64> {
        if self.has_price {
            // A priced listing whose msrp failed to parse sorts with the free titles.
            OrderedFloat(self.active_price().unwrap_or(0.0))
        } else {
            OrderedFloat(f64::INFINITY)
        }
    }

    #[must_use]
    pub fn release_date(&self) -> Option<DateTime<Utc>> {
        parse_release_date(&self.release_date_raw)
    }

    /// Human-readable availability relative to `now`.
    #[must_use]
    pub fn availability_text(&self, now: DateTime<Utc>) -> String {
        if self.release_date_raw.trim().is_empty() {
            return CHECK_LATER.to_string();
        }
        match self.release_date() {
            None => self.release_date_raw.clone(),
            Some(date) if date < now => AVAILABLE_NOW.to_string(),
            Some(date) => format!("{AVAILABLE_PREFIX}{}", date.format("%b %-d, %Y")),
        }
    }

    /// Whole percent off MSRP while on sale.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn percent_off(&self) -> Option<i64> {
        if !self.on_sale {
            return None;
        }
        let msrp = self.msrp?;
        let sale = self.sale_price?;
        if msrp <= 0.0 || sale <= 0.0 {
            return None;
        }
        Some(((msrp - sale) / msrp * 100.0) as i64)
    }

    /// Display price: `"$sale $msrp"` while on sale, `"Free"` for zero-priced
    /// titles, `"Pricing unavailable"` when unpriced.
    #[must_use]
    pub fn price_label(&self) -> String {
        match (self.has_price, self.msrp, self.sale_price) {
            (true, Some(msrp), Some(sale)) if self.on_sale => format!("${sale:.2} ${msrp:.2}"),
            (true, None, Some(sale)) if self.on_sale => format!("${sale:.2}"),
            (true, Some(msrp), _) if msrp.abs() < f64::EPSILON => "Free".to_string(),
            (true, Some(msrp), _) => format!("${msrp:.2}"),
            _ => "Pricing unavailable".to_string(),
        }
    }

    /// Absolute box art URL under `site_base`.
    #[must_use]
    pub fn box_art_url(&self, site_base: &str) -> String {
        format!("{}{}", site_base.trim_end_matches('/'), self.box_art_path)
    }
}

impl AsRef<Listing> for Listing {
    fn as_ref(&self) -> &Listing {
        self
    }
}
