//! Remote catalog source.
//!
//! [`ListingSource`] is the seam between the sync engine and the network.
//! [`HttpListingSource`] talks to the real API; tests substitute scripted
//! sources.

pub mod http;

pub use http::HttpListingSource;

use async_trait::async_trait;
use wishlist_core::{ContinuationKey, DetailsPage, UpdatePage};

use crate::error::SyncError;

/// Request for one page of the update feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Only records modified after this epoch-ms value are returned.
    pub watermark: i64,
    /// Cursor from the previous page; `None` for the first page.
    pub start: Option<ContinuationKey>,
}

impl PageRequest {
    #[must_use]
    pub fn first(watermark: i64) -> Self {
        Self {
            watermark,
            start: None,
        }
    }

    #[must_use]
    pub fn next(&self, start: ContinuationKey) -> Self {
        Self {
            watermark: self.watermark,
            start: Some(start),
        }
    }
}

/// Paged access to the remote catalog.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetches one page of records modified after `request.watermark`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RequestConstructionFailed`],
    /// [`SyncError::TransportFailed`] or [`SyncError::EnvelopeDecodeFailed`].
    async fn fetch_updates(&self, request: &PageRequest) -> Result<UpdatePage, SyncError>;

    /// Fetches the detail record for `id`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ListingSource::fetch_updates`].
    async fn fetch_details(&self, id: i64) -> Result<DetailsPage, SyncError>;
}
