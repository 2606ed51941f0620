//! Sync engine: pulls the update feed page by page and commits it to the catalog.
//!
//! A run walks the feed from the stored watermark, following continuation
//! keys until the last page, and only then commits: the catalog is replaced
//! (full refresh) or merged (incremental), derived state is rebuilt through
//! the [`CatalogObserver`], and the new watermark and snapshot are persisted.
//! Any failure before the commit leaves the catalog untouched.
//!
//! At most one run is in flight. The flag is claimed with a compare-exchange
//! and released by [`SyncGuard`] on every exit path, including a dropped
//! future after a timeout or cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;
use wishlist_core::{decode_items, Listing};

use crate::catalog::{CatalogStore, MergeReport};
use crate::error::SyncError;
use crate::source::{ListingSource, PageRequest};
use crate::store::{self, LocalStore};

/// Current time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// What a commit did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogChange {
    /// Full refresh replaced the catalog.
    Replaced { count: usize },
    /// Incremental sync merged into it.
    Merged(MergeReport),
    /// Catalog was loaded from the local snapshot.
    Restored { count: usize },
}

/// Rebuilds state derived from the catalog after each commit.
///
/// Called synchronously after the catalog write lock is released.
pub trait CatalogObserver: Send + Sync {
    fn on_catalog_changed(&self, catalog: &CatalogStore, change: CatalogChange);
}

/// Observer that ignores every change.
pub struct NullObserver;

impl CatalogObserver for NullObserver {
    fn on_catalog_changed(&self, _catalog: &CatalogStore, _change: CatalogChange) {}
}

// ---------------------------------------------------------------------------
// SyncGuard
// ---------------------------------------------------------------------------

/// RAII claim on the in-progress flag. Dropping it makes the engine idle.
#[derive(Debug)]
pub struct SyncGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// SyncReport
// ---------------------------------------------------------------------------

/// Summary of a successful sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: Uuid,
    /// Whether the run replaced the catalog. True when requested or when no
    /// watermark was stored.
    pub full_refresh: bool,
    pub pages: usize,
    /// Records decoded across all pages.
    pub fetched: usize,
    /// Records dropped as undecodable.
    pub skipped: usize,
    /// Merge outcome for incremental runs that fetched something.
    pub merge: Option<MergeReport>,
    /// Watermark persisted by this run, if any records were fetched.
    pub watermark: Option<i64>,
    pub snapshot_saved: bool,
}

struct FetchedPages {
    listings: Vec<Listing>,
    pages: usize,
    skipped: usize,
}

// ---------------------------------------------------------------------------
// SyncEngine
// ---------------------------------------------------------------------------

pub struct SyncEngine {
    source: Arc<dyn ListingSource>,
    store: Arc<dyn LocalStore>,
    catalog: Arc<CatalogStore>,
    observer: Arc<dyn CatalogObserver>,
    in_progress: Arc<AtomicBool>,
    max_pages: usize,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        source: Arc<dyn ListingSource>,
        store: Arc<dyn LocalStore>,
        catalog: Arc<CatalogStore>,
        observer: Arc<dyn CatalogObserver>,
        max_pages: usize,
    ) -> Self {
        Self {
            source,
            store,
            catalog,
            observer,
            in_progress: Arc::new(AtomicBool::new(false)),
            max_pages,
        }
    }

    /// Claims the in-progress flag.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SyncAlreadyInProgress`] if another holder exists.
    pub fn try_acquire(&self) -> Result<SyncGuard, SyncError> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::SyncAlreadyInProgress)?;
        Ok(SyncGuard {
            flag: Arc::clone(&self.in_progress),
        })
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Runs one sync.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SyncAlreadyInProgress`] without touching the
    /// network if a run is already in flight; otherwise any fetch, decode or
    /// local store failure of the run.
    pub async fn sync(&self, full_refresh: bool) -> Result<SyncReport, SyncError> {
        let guard = self.try_acquire()?;
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "sync",
            %run_id,
            full_refresh,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let result = self.run(run_id, full_refresh).await;

            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = start.elapsed().as_millis() as u64;
            let outcome = if result.is_ok() { "ok" } else { "error" };
            tracing::Span::current().record("duration_ms", duration_ms);
            tracing::Span::current().record("outcome", outcome);

            match &result {
                Ok(report) => info!(
                    pages = report.pages,
                    fetched = report.fetched,
                    skipped = report.skipped,
                    duration_ms,
                    "sync complete"
                ),
                Err(err) => warn!(error = %err, duration_ms, "sync failed"),
            }
            drop(guard);
            result
        }
        .instrument(span)
        .await
    }

    /// Runs one sync bounded by `timeout`. Nothing is committed on timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TimedOut`] if the run does not finish in time, or
    /// any error of [`SyncEngine::sync`].
    pub async fn sync_with_timeout(
        &self,
        full_refresh: bool,
        timeout: Duration,
    ) -> Result<SyncReport, SyncError> {
        match tokio::time::timeout(timeout, self.sync(full_refresh)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?timeout, "sync timed out");
                Err(SyncError::TimedOut { timeout })
            }
        }
    }

    /// Runs one sync that aborts when `token` is cancelled. Nothing is
    /// committed on cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] if the token fires first, or any error
    /// of [`SyncEngine::sync`].
    pub async fn sync_cancellable(
        &self,
        full_refresh: bool,
        token: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                info!("sync cancelled");
                Err(SyncError::Cancelled)
            }
            result = self.sync(full_refresh) => result,
        }
    }

    async fn run(&self, run_id: Uuid, requested_full: bool) -> Result<SyncReport, SyncError> {
        let stored = store::load_watermark(self.store.as_ref())
            .map_err(SyncError::LocalStoreReadFailed)?;
        // A zero watermark never came from a real record.
        let (full_refresh, watermark) = match stored {
            Some(watermark) if !requested_full && watermark > 0 => (false, watermark),
            _ => (true, 0),
        };
        info!(watermark, full_refresh, "sync started");

        let fetched = self.fetch_all(watermark).await?;
        let mut report = SyncReport {
            run_id,
            full_refresh,
            pages: fetched.pages,
            fetched: fetched.listings.len(),
            skipped: fetched.skipped,
            merge: None,
            watermark: None,
            snapshot_saved: false,
        };

        if !full_refresh && fetched.listings.is_empty() {
            debug!("no updates since watermark");
            return Ok(report);
        }

        // Everything below is synchronous: a dropped future cannot leave a
        // half-applied commit behind.
        let new_watermark = fetched.listings.iter().map(|l| l.last_modified).max();
        let change = if full_refresh {
            let count = fetched.listings.len();
            self.catalog.replace_all(fetched.listings);
            CatalogChange::Replaced { count }
        } else {
            let merge = self.catalog.merge(fetched.listings);
            report.merge = Some(merge);
            CatalogChange::Merged(merge)
        };
        self.observer.on_catalog_changed(&self.catalog, change);

        if let Some(watermark) = new_watermark {
            store::store_sync_marks(self.store.as_ref(), watermark, now_millis())
                .map_err(SyncError::LocalStoreWriteFailed)?;
            report.watermark = Some(watermark);
        }

        report.snapshot_saved = match self.store.save_snapshot(&self.catalog.to_vec()) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to save catalog snapshot");
                false
            }
        };
        Ok(report)
    }

    async fn fetch_all(&self, watermark: i64) -> Result<FetchedPages, SyncError> {
        let mut request = PageRequest::first(watermark);
        let mut fetched = FetchedPages {
            listings: Vec::new(),
            pages: 0,
            skipped: 0,
        };

        loop {
            if fetched.pages >= self.max_pages {
                return Err(SyncError::PageLimitExceeded {
                    max_pages: self.max_pages,
                });
            }
            let page = self.source.fetch_updates(&request).await?;
            fetched.pages += 1;

            let Some(items) = page.items.as_deref() else {
                return Err(SyncError::EnvelopeDecodeFailed {
                    reason: "response has no Items array".to_string(),
                });
            };
            let batch = decode_items(items);
            debug!(
                page = fetched.pages,
                count = page.count,
                decoded = batch.listings.len(),
                skipped = batch.skipped,
                "fetched page"
            );
            fetched.skipped += batch.skipped;
            fetched.listings.extend(batch.listings);

            match page.last_evaluated_key {
                None => return Ok(fetched),
                Some(key) => {
                    let next = key.resolve().ok_or(SyncError::NoContinuationKey)?;
                    request = request.next(next);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use tokio::sync::Notify;
    use wishlist_core::wire::WireContinuationKey;
    use wishlist_core::{DetailsPage, UpdatePage};

    use super::*;
    use crate::error::StoreError;
    use crate::store::{load_last_attempt, load_watermark, MemoryStore};

    // -- Fixtures ------------------------------------------------------------

    pub(crate) fn item(id: i64, title: &str, last_modified: i64) -> Value {
        json!({
            "nsuid": { "S": id.to_string() },
            "title": { "S": title },
            "lastModified": { "N": last_modified.to_string() },
            "msrp": { "N": "19.99" },
            "salePrice": { "NULL": true },
        })
    }

    pub(crate) fn page(items: Vec<Value>, next: Option<(&str, &str)>) -> UpdatePage {
        UpdatePage {
            count: items.len() as u64,
            scanned_count: items.len() as u64,
            last_evaluated_key: next.map(|(id, lm)| WireContinuationKey {
                nsuid: Some(wishlist_core::wire::AttrString::new(id)),
                last_modified: Some(wishlist_core::wire::AttrNumber {
                    n: Some(lm.to_string()),
                }),
            }),
            items: Some(items),
        }
    }

    /// Source that replays scripted responses and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        responses: Mutex<VecDeque<Result<UpdatePage, SyncError>>>,
        details: Mutex<VecDeque<Result<DetailsPage, SyncError>>>,
        pub(crate) requests: Mutex<Vec<PageRequest>>,
        pub(crate) detail_requests: Mutex<Vec<i64>>,
    }

    impl ScriptedSource {
        pub(crate) fn new(responses: Vec<Result<UpdatePage, SyncError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        pub(crate) fn push(&self, response: Result<UpdatePage, SyncError>) {
            self.responses.lock().push_back(response);
        }

        pub(crate) fn push_details(&self, response: Result<DetailsPage, SyncError>) {
            self.details.lock().push_back(response);
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl ListingSource for ScriptedSource {
        async fn fetch_updates(&self, request: &PageRequest) -> Result<UpdatePage, SyncError> {
            self.requests.lock().push(request.clone());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(page(Vec::new(), None)))
        }

        async fn fetch_details(&self, id: i64) -> Result<DetailsPage, SyncError> {
            self.detail_requests.lock().push(id);
            self.details.lock().pop_front().unwrap_or(Ok(DetailsPage {
                count: 0,
                scanned_count: 0,
                items: Some(Vec::new()),
            }))
        }
    }

    /// Source that blocks its first call until released.
    struct GatedSource {
        entered: Notify,
        release: Notify,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ListingSource for GatedSource {
        async fn fetch_updates(&self, _request: &PageRequest) -> Result<UpdatePage, SyncError> {
            *self.calls.lock() += 1;
            self.entered.notify_one();
            self.release.notified().await;
            Ok(page(vec![item(1, "Gated", 10)], None))
        }

        async fn fetch_details(&self, _id: i64) -> Result<DetailsPage, SyncError> {
            unreachable!("not used")
        }
    }

    /// Source whose every call hangs.
    struct HangingSource;

    #[async_trait]
    impl ListingSource for HangingSource {
        async fn fetch_updates(&self, _request: &PageRequest) -> Result<UpdatePage, SyncError> {
            std::future::pending().await
        }

        async fn fetch_details(&self, _id: i64) -> Result<DetailsPage, SyncError> {
            std::future::pending().await
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        changes: Mutex<Vec<CatalogChange>>,
    }

    impl CatalogObserver for RecordingObserver {
        fn on_catalog_changed(&self, _catalog: &CatalogStore, change: CatalogChange) {
            self.changes.lock().push(change);
        }
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore(MemoryStore);

    impl LocalStore for ReadOnlyStore {
        fn load_snapshot(&self) -> Result<Option<Vec<Listing>>, StoreError> {
            self.0.load_snapshot()
        }

        fn save_snapshot(&self, _listings: &[Listing]) -> Result<(), StoreError> {
            Err(StoreError::Write {
                path: "games.json".into(),
                source: std::io::Error::other("read-only"),
            })
        }

        fn load_setting(&self, key: &str) -> Result<Option<Value>, StoreError> {
            self.0.load_setting(key)
        }

        fn store_settings(&self, entries: Vec<(&str, Value)>) -> Result<(), StoreError> {
            self.0.store_settings(entries)
        }
    }

    struct Harness {
        engine: SyncEngine,
        catalog: Arc<CatalogStore>,
        store: Arc<MemoryStore>,
        observer: Arc<RecordingObserver>,
    }

    fn harness(source: Arc<dyn ListingSource>) -> Harness {
        let catalog = Arc::new(CatalogStore::new());
        let store = Arc::new(MemoryStore::new());
        let observer = Arc::new(RecordingObserver::default());
        let engine = SyncEngine::new(
            source,
            store.clone(),
            catalog.clone(),
            observer.clone(),
            1000,
        );
        Harness {
            engine,
            catalog,
            store,
            observer,
        }
    }

    fn catalog_ids(catalog: &CatalogStore) -> Vec<i64> {
        catalog.all().iter().map(|l| l.id).collect()
    }

    // -- Tests ---------------------------------------------------------------

    #[tokio::test]
    async fn multi_page_full_refresh_follows_cursor() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(page(
                vec![item(1, "A", 100), item(2, "B", 300)],
                Some(("2", "300")),
            )),
            Ok(page(vec![item(3, "C", 200)], None)),
        ]));
        let h = harness(source.clone());

        let report = h.engine.sync(true).await.unwrap();
        assert!(report.full_refresh);
        assert_eq!(report.pages, 2);
        assert_eq!(report.fetched, 3);
        assert_eq!(report.watermark, Some(300));
        assert!(report.snapshot_saved);

        let requests = source.requests.lock().clone();
        assert_eq!(requests[0], PageRequest::first(0));
        assert_eq!(requests[1].start.as_ref().unwrap().id, "2");
        assert_eq!(requests[1].start.as_ref().unwrap().last_modified, "300");

        assert_eq!(catalog_ids(&h.catalog), vec![1, 2, 3]);
        assert_eq!(load_watermark(h.store.as_ref()).unwrap(), Some(300));
        assert!(load_last_attempt(h.store.as_ref()).unwrap().is_some());
        assert_eq!(h.store.load_snapshot().unwrap().unwrap().len(), 3);
        assert_eq!(
            *h.observer.changes.lock(),
            vec![CatalogChange::Replaced { count: 3 }]
        );
    }

    #[tokio::test]
    async fn missing_watermark_forces_full_refresh() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(page(
            vec![item(1, "A", 5)],
            None,
        ))]));
        let h = harness(source.clone());
        h.catalog
            .replace_all(vec![crate::catalog::tests::listing(99, "stale")]);

        let report = h.engine.sync(false).await.unwrap();
        assert!(report.full_refresh);
        assert_eq!(source.requests.lock()[0].watermark, 0);
        assert_eq!(catalog_ids(&h.catalog), vec![1]);
    }

    #[tokio::test]
    async fn zero_watermark_forces_full_refresh() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(page(
            vec![item(1, "A", 5)],
            None,
        ))]));
        let h = harness(source.clone());
        crate::store::store_sync_marks(h.store.as_ref(), 0, 1).unwrap();
        h.catalog
            .replace_all(vec![crate::catalog::tests::listing(99, "stale")]);

        let report = h.engine.sync(false).await.unwrap();
        assert!(report.full_refresh);
        assert_eq!(source.requests.lock()[0].watermark, 0);
        assert_eq!(catalog_ids(&h.catalog), vec![1]);
    }

    #[tokio::test]
    async fn incremental_sync_merges_from_watermark() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(page(vec![item(1, "A", 100), item(2, "B", 100)], None)),
            Ok(page(vec![item(2, "B2", 150), item(3, "C", 160)], None)),
        ]));
        let h = harness(source.clone());
        h.engine.sync(true).await.unwrap();

        let report = h.engine.sync(false).await.unwrap();
        assert!(!report.full_refresh);
        assert_eq!(source.requests.lock()[1].watermark, 100);
        assert_eq!(
            report.merge,
            Some(MergeReport {
                inserted: 1,
                updated: 1,
                unchanged: 0
            })
        );
        assert_eq!(catalog_ids(&h.catalog), vec![1, 2, 3]);
        assert_eq!(h.catalog.get(2).unwrap().title, "B2");
        assert_eq!(load_watermark(h.store.as_ref()).unwrap(), Some(160));
    }

    #[tokio::test]
    async fn empty_incremental_sync_commits_nothing() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(page(
            vec![item(1, "A", 100)],
            None,
        ))]));
        let h = harness(source.clone());
        h.engine.sync(true).await.unwrap();
        let revision = h.catalog.revision();

        let report = h.engine.sync(false).await.unwrap();
        assert_eq!(report.fetched, 0);
        assert_eq!(report.watermark, None);
        assert_eq!(h.catalog.revision(), revision);
        assert_eq!(h.observer.changes.lock().len(), 1);
        assert_eq!(load_watermark(h.store.as_ref()).unwrap(), Some(100));
    }

    #[tokio::test]
    async fn failure_mid_pagination_leaves_catalog_untouched() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(page(vec![item(1, "A", 100)], Some(("1", "100")))),
            Err(SyncError::TransportFailed(anyhow::anyhow!("connection reset"))),
        ]));
        let h = harness(source);
        h.catalog
            .replace_all(vec![crate::catalog::tests::listing(7, "kept")]);

        let err = h.engine.sync(true).await.unwrap_err();
        assert!(matches!(err, SyncError::TransportFailed(_)));
        assert!(err.is_retryable());
        assert_eq!(catalog_ids(&h.catalog), vec![7]);
        assert!(h.observer.changes.lock().is_empty());
        assert_eq!(load_watermark(h.store.as_ref()).unwrap(), None);
        assert!(!h.engine.is_syncing());
    }

    #[tokio::test]
    async fn partial_continuation_key_is_an_error() {
        let mut bad = page(vec![item(1, "A", 1)], None);
        bad.last_evaluated_key = Some(WireContinuationKey {
            nsuid: Some(wishlist_core::wire::AttrString::new("1")),
            last_modified: None,
        });
        let h = harness(Arc::new(ScriptedSource::new(vec![Ok(bad)])));

        let err = h.engine.sync(true).await.unwrap_err();
        assert!(matches!(err, SyncError::NoContinuationKey));
        assert!(h.catalog.is_empty());
    }

    #[tokio::test]
    async fn missing_items_is_an_envelope_error() {
        let mut empty = page(Vec::new(), None);
        empty.items = None;
        let h = harness(Arc::new(ScriptedSource::new(vec![Ok(empty)])));

        let err = h.engine.sync(true).await.unwrap_err();
        assert!(matches!(err, SyncError::EnvelopeDecodeFailed { .. }));
    }

    #[tokio::test]
    async fn undecodable_records_are_skipped() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(page(
            vec![item(1, "A", 1), json!({ "title": { "S": "no id" } }), item(2, "B", 2)],
            None,
        ))]));
        let h = harness(source);

        let report = h.engine.sync(true).await.unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(catalog_ids(&h.catalog), vec![1, 2]);
    }

    #[tokio::test]
    async fn page_limit_stops_runaway_pagination() {
        let source = Arc::new(ScriptedSource::default());
        for n in 0..5 {
            let id = n.to_string();
            source.push(Ok(page(vec![item(n + 1, "Loop", 1)], Some((id.as_str(), "1")))));
        }
        let catalog = Arc::new(CatalogStore::new());
        let engine = SyncEngine::new(
            source.clone(),
            Arc::new(MemoryStore::new()),
            catalog.clone(),
            Arc::new(NullObserver),
            3,
        );

        let err = engine.sync(true).await.unwrap_err();
        assert!(matches!(err, SyncError::PageLimitExceeded { max_pages: 3 }));
        assert_eq!(source.calls(), 3);
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn concurrent_sync_is_rejected_without_network_call() {
        let source = Arc::new(GatedSource {
            entered: Notify::new(),
            release: Notify::new(),
            calls: Mutex::new(0),
        });
        let h = harness(source.clone());
        let engine = Arc::new(h.engine);

        let first = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.sync(true).await }
        });
        source.entered.notified().await;
        assert!(engine.is_syncing());

        let second = engine.sync(false).await;
        assert!(matches!(second, Err(SyncError::SyncAlreadyInProgress)));
        assert_eq!(*source.calls.lock(), 1);

        source.release.notify_one();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.fetched, 1);
        assert!(!engine.is_syncing());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_releases_flag_and_commits_nothing() {
        let h = harness(Arc::new(HangingSource));

        let err = h
            .engine
            .sync_with_timeout(true, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::TimedOut { .. }));
        assert!(!h.engine.is_syncing());
        assert!(h.catalog.is_empty());
        assert!(h.observer.changes.lock().is_empty());
    }

    #[tokio::test]
    async fn cancellation_releases_flag() {
        let h = harness(Arc::new(HangingSource));
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });

        let err = h.engine.sync_cancellable(true, &token).await.unwrap_err();
        assert!(matches!(err, SyncError::Cancelled));
        assert!(!h.engine.is_syncing());
        assert!(h.engine.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn snapshot_failure_is_reported_not_fatal() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(page(
            vec![item(1, "A", 42)],
            None,
        ))]));
        let store = Arc::new(ReadOnlyStore(MemoryStore::new()));
        let catalog = Arc::new(CatalogStore::new());
        let engine = SyncEngine::new(
            source,
            store.clone(),
            catalog.clone(),
            Arc::new(NullObserver),
            10,
        );

        let report = engine.sync(true).await.unwrap();
        assert!(!report.snapshot_saved);
        assert_eq!(catalog.count(), 1);
        assert_eq!(load_watermark(store.as_ref()).unwrap(), Some(42));
    }

    #[test]
    fn guard_releases_on_drop() {
        let h = harness(Arc::new(ScriptedSource::default()));
        let guard = h.engine.try_acquire().unwrap();
        assert!(matches!(
            h.engine.try_acquire(),
            Err(SyncError::SyncAlreadyInProgress)
        ));
        drop(guard);
        assert!(h.engine.try_acquire().is_ok());
    }
}
