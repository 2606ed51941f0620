//! Typed attribute envelopes used by the remote catalog API.
//!
//! Every field on the wire is wrapped in a single-key object naming its type,
//! the way a `DynamoDB` scan serializes items:
//!
//! ```json
//! { "title": { "S": "Celeste" }, "msrp": { "N": "19.99" }, "salePrice": { "NULL": true } }
//! ```
//!
//! The structs here mirror that shape field-for-field. All fields are optional
//! so that a missing or malformed attribute never fails the surrounding record;
//! the `unpack_*` helpers apply the default-value rules afterwards.

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Attribute envelopes
// ---------------------------------------------------------------------------

/// String attribute: `{"S": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrString {
    #[serde(rename = "S", default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
}

impl AttrString {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            s: Some(value.into()),
        }
    }
}

/// Number attribute: `{"N": "123"}`. Numbers travel as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrNumber {
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
}

impl AttrNumber {
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        Self {
            n: Some(value.to_string()),
        }
    }
}

/// Nullable number attribute: `{"NULL": true}` or `{"N": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrNullableNumber {
    #[serde(rename = "NULL", default, skip_serializing_if = "Option::is_none")]
    pub null: Option<bool>,
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
}

impl AttrNullableNumber {
    /// The explicit null marker.
    #[must_use]
    pub fn null() -> Self {
        Self {
            null: Some(true),
            n: None,
        }
    }

    #[must_use]
    pub fn number(value: f64) -> Self {
        Self {
            null: None,
            n: Some(value.to_string()),
        }
    }

    /// Returns `true` only when the attribute carries `"NULL": true`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.null == Some(true)
    }
}

/// Nullable string attribute: `{"NULL": true}` or `{"S": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrNullableString {
    #[serde(rename = "NULL", default, skip_serializing_if = "Option::is_none")]
    pub null: Option<bool>,
    #[serde(rename = "S", default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
}

impl AttrNullableString {
    #[must_use]
    pub fn null() -> Self {
        Self {
            null: Some(true),
            s: None,
        }
    }

    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            null: None,
            s: Some(value.into()),
        }
    }
}

/// List-of-strings attribute: `{"L": [{"S": "..."}, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrList {
    #[serde(rename = "L", default, skip_serializing_if = "Option::is_none")]
    pub l: Option<Vec<AttrString>>,
}

impl AttrList {
    #[must_use]
    pub fn from_strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            l: Some(values.into_iter().map(AttrString::new).collect()),
        }
    }
}

/// Boolean attribute: `{"BOOL": true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrBool {
    #[serde(rename = "BOOL", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
}

impl AttrBool {
    #[must_use]
    pub fn new(value: bool) -> Self {
        Self { value: Some(value) }
    }
}

// ---------------------------------------------------------------------------
// Unpacking helpers
// ---------------------------------------------------------------------------

pub fn unpack_string(attr: Option<&AttrString>, default: &str) -> String {
    attr.and_then(|a| a.s.clone())
        .unwrap_or_else(|| default.to_string())
}

/// Returns the string payload, or `None` when absent or null-marked.
pub fn unpack_nullable_string(attr: Option<&AttrNullableString>) -> Option<String> {
    attr.and_then(|a| a.s.clone())
}

/// Unpacks a list, skipping elements that carry no string payload.
pub fn unpack_list(attr: Option<&AttrList>) -> Vec<String> {
    attr.and_then(|a| a.l.as_ref())
        .map(|items| items.iter().filter_map(|item| item.s.clone()).collect())
        .unwrap_or_default()
}

pub fn unpack_bool(attr: Option<&AttrBool>, default: bool) -> bool {
    attr.and_then(|a| a.value).unwrap_or(default)
}

pub fn unpack_i64(attr: Option<&AttrNumber>, default: i64) -> i64 {
    let Some(raw) = attr.and_then(|a| a.n.as_deref()) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(raw, "invalid integer attribute");
        default
    })
}

/// Parses a price payload. Any finite number is accepted.
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Returns the numeric payload of a nullable number, or `None` when absent,
/// null-marked or unparseable.
pub fn unpack_price(attr: Option<&AttrNullableNumber>) -> Option<f64> {
    let raw = attr.and_then(|a| a.n.as_deref())?;
    let parsed = parse_price(raw);
    if parsed.is_none() {
        warn!(raw, "invalid price attribute");
    }
    parsed
}

// ---------------------------------------------------------------------------
// Page envelopes
// ---------------------------------------------------------------------------

/// Compound cursor as it appears on the wire in `LastEvaluatedKey`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireContinuationKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsuid: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<AttrNumber>,
}

/// Cursor needed to request the next page. Both parts are passed back
/// verbatim as query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationKey {
    pub id: String,
    pub last_modified: String,
}

impl WireContinuationKey {
    /// Extracts the cursor, or `None` if either half is missing.
    #[must_use]
    pub fn resolve(&self) -> Option<ContinuationKey> {
        let id = self.nsuid.as_ref()?.s.clone()?;
        let last_modified = self.last_modified.as_ref()?.n.clone()?;
        Some(ContinuationKey { id, last_modified })
    }
}

/// One page of `GET games/modified-after/{watermark}`.
///
/// `items` is kept as raw JSON so that a single malformed record can be
/// dropped without failing the whole page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdatePage {
    pub count: u64,
    pub scanned_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<WireContinuationKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<serde_json::Value>>,
}

/// Response of `GET games/nsuid/{id}`. At most one item is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetailsPage {
    pub count: u64,
    pub scanned_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<serde_json::Value>>,
}

// ---------------------------------------------------------------------------
// Record shapes
// ---------------------------------------------------------------------------

/// Summary record as served by the update feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsuid: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub franchises: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_filters: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_filters: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<AttrNullableString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msrp: Option<AttrNullableNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<AttrNullableNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<AttrBool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esrb_rating: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boxart: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date_display: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<AttrNumber>,
}

/// Full record as served by the single-item endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsuid: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub franchises: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_filters: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_filters: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<AttrNullableString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msrp: Option<AttrNullableNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<AttrNullableNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lowest_price: Option<AttrNullableNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<AttrBool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_to_start: Option<AttrBool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esrb_rating: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esrb_descriptors: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boxart: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_header_image: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date_display: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<AttrNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developers: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publishers: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_of_players: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_languages: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_modes: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_to_shop: Option<AttrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<AttrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<AttrString>,
}

/// Parses the `nsuid` attribute. Zero is not a usable identifier.
pub(crate) fn unpack_id(attr: Option<&AttrString>) -> Option<i64> {
    let raw = attr?.s.as_deref()?;
    raw.trim().parse::<i64>().ok().filter(|id| *id != 0)
}
