//! HTTP implementation of [`ListingSource`] using `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use wishlist_core::{DetailsPage, UpdatePage};

use super::{ListingSource, PageRequest};
use crate::error::SyncError;

/// Client for `GET games/modified-after/{watermark}` and `GET games/nsuid/{id}`.
#[derive(Debug, Clone)]
pub struct HttpListingSource {
    client: Client,
    base: Url,
}

impl HttpListingSource {
    /// # Errors
    ///
    /// Returns [`SyncError::RequestConstructionFailed`] if `base_url` is not a
    /// valid absolute URL or the HTTP client cannot be built.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, SyncError> {
        // `Url::join` replaces the last path segment unless the base ends in '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized).map_err(|err| SyncError::RequestConstructionFailed {
            reason: format!("invalid base url {base_url}: {err}"),
        })?;
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| SyncError::RequestConstructionFailed {
                reason: err.to_string(),
            })?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.base
            .join(path)
            .map_err(|err| SyncError::RequestConstructionFailed {
                reason: format!("invalid path {path}: {err}"),
            })
    }

    /// Builds the URL for one page of the update feed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RequestConstructionFailed`] if the URL cannot be built.
    pub fn updates_url(&self, request: &PageRequest) -> Result<Url, SyncError> {
        let mut url = self.endpoint(&format!("games/modified-after/{}", request.watermark))?;
        if let Some(start) = &request.start {
            url.query_pairs_mut()
                .append_pair("startNsuid", &start.id)
                .append_pair("startLastModified", &start.last_modified);
        }
        Ok(url)
    }

    /// # Errors
    ///
    /// Returns [`SyncError::RequestConstructionFailed`] if the URL cannot be built.
    pub fn details_url(&self, id: i64) -> Result<Url, SyncError> {
        self.endpoint(&format!("games/nsuid/{id}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SyncError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| SyncError::TransportFailed(err.into()))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| SyncError::TransportFailed(err.into()))?;
        serde_json::from_slice(&body).map_err(|err| SyncError::EnvelopeDecodeFailed {
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_updates(&self, request: &PageRequest) -> Result<UpdatePage, SyncError> {
        let url = self.updates_url(request)?;
        self.get_json(url).await
    }

    async fn fetch_details(&self, id: i64) -> Result<DetailsPage, SyncError> {
        let url = self.details_url(id)?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use wishlist_core::ContinuationKey;

    use super::*;

    fn source(base: &str) -> HttpListingSource {
        HttpListingSource::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn first_page_url_has_no_cursor() {
        let url = source("https://api.example.com/prod")
            .updates_url(&PageRequest::first(0))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/prod/games/modified-after/0"
        );
    }

    #[test]
    fn next_page_url_carries_cursor() {
        let request = PageRequest::first(1_587_513_742_299).next(ContinuationKey {
            id: "70010000000025".to_string(),
            last_modified: "1587513742300".to_string(),
        });
        let url = source("https://api.example.com/prod/")
            .updates_url(&request)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/prod/games/modified-after/1587513742299\
             ?startNsuid=70010000000025&startLastModified=1587513742300"
        );
    }

    #[test]
    fn details_url() {
        let url = source("https://api.example.com/").details_url(42).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/games/nsuid/42");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpListingSource::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SyncError::RequestConstructionFailed { .. }));
    }
}
