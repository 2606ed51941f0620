//! Full detail record for a single catalog entry.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::listing::{
    decode_prices, normalize_general_tags, Listing, DEFAULT_LAST_MODIFIED, NOT_AVAILABLE,
};
use crate::wire::{self, WireDetails};

pub const DESCRIPTION_UNAVAILABLE: &str = "Description unavailable";

/// Superset of [`Listing`] served by the single-item endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
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
    pub lowest_price: Option<f64>,
    pub on_sale: bool,
    pub has_price: bool,
    pub featured: bool,
    pub free_to_start: bool,
    pub esrb_rating: String,
    pub esrb_descriptors: Vec<String>,
    pub box_art_path: String,
    pub hero_image: String,
    pub gallery: Vec<String>,
    pub release_date_raw: String,
    pub last_modified: i64,
    pub description: String,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,
    pub number_of_players: String,
    pub file_size: String,
    pub supported_languages: String,
    pub play_modes: Vec<String>,
    pub how_to_shop: Vec<String>,
    pub slug: String,
    /// Path of the store page, relative to the site root.
    pub url: String,
}

/// Decodes a detail record. Same failure rule as listings: only a missing or
/// unparseable id rejects the record.
pub fn decode_details(raw: &WireDetails) -> Option<Details> {
    let Some(id) = wire::unpack_id(raw.nsuid.as_ref()) else {
        warn!("dropping details without usable id");
        return None;
    };

    let featured = wire::unpack_bool(raw.featured.as_ref(), false);
    let (msrp, has_price, sale_price, on_sale) =
        decode_prices(raw.msrp.as_ref(), raw.sale_price.as_ref());

    Some(Details {
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
        lowest_price: wire::unpack_price(raw.lowest_price.as_ref()),
        on_sale,
        has_price,
        featured,
        free_to_start: wire::unpack_bool(raw.free_to_start.as_ref(), false),
        esrb_rating: wire::unpack_string(raw.esrb_rating.as_ref(), NOT_AVAILABLE),
        esrb_descriptors: wire::unpack_list(raw.esrb_descriptors.as_ref()),
        box_art_path: wire::unpack_string(raw.boxart.as_ref(), ""),
        hero_image: wire::unpack_string(raw.horizontal_header_image.as_ref(), ""),
        gallery: wire::unpack_list(raw.gallery.as_ref()),
        release_date_raw: wire::unpack_string(raw.release_date_display.as_ref(), ""),
        last_modified: wire::unpack_i64(raw.last_modified.as_ref(), DEFAULT_LAST_MODIFIED),
        description: wire::unpack_string(raw.description.as_ref(), DESCRIPTION_UNAVAILABLE),
        developers: wire::unpack_list(raw.developers.as_ref()),
        publishers: wire::unpack_list(raw.publishers.as_ref()),
        number_of_players: wire::unpack_string(raw.num_of_players.as_ref(), ""),
        file_size: wire::unpack_string(raw.file_size.as_ref(), ""),
        supported_languages: wire::unpack_string(raw.supported_languages.as_ref(), ""),
        play_modes: wire::unpack_list(raw.play_modes.as_ref()),
        how_to_shop: wire::unpack_list(raw.how_to_shop.as_ref()),
        slug: wire::unpack_string(raw.slug.as_ref(), ""),
        url: wire::unpack_string(raw.url.as_ref(), ""),
    })
}

impl Details {
    /// Projects onto the summary form.
    #[must_use]
    pub fn to_listing(&self) -> Listing {
        Listing {
            id: self.id,
            title: self.title.clone(),
            platform: self.platform.clone(),
            genres: self.genres.clone(),
            franchises: self.franchises.clone(),
            availability: self.availability.clone(),
            player_tags: self.player_tags.clone(),
            general_tags: self.general_tags.clone(),
            price_range: self.price_range.clone(),
            msrp: self.msrp,
            sale_price: self.sale_price,
            on_sale: self.on_sale,
            has_price: self.has_price,
            featured: self.featured,
            esrb_rating: self.esrb_rating.clone(),
            box_art_path: self.box_art_path.clone(),
            release_date_raw: self.release_date_raw.clone(),
            last_modified: self.last_modified,
        }
    }

    /// Absolute store page URL, or `None` when the record carries no path.
    #[must_use]
    pub fn page_url(&self, site_base: &str) -> Option<String> {
        if self.url.is_empty() {
            return None;
        }
        Some(format!("{}{}", site_base.trim_end_matches('/'), self.url))
    }
}
