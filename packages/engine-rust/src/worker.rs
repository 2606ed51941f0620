//! Periodic and on-demand catalog refresh.
//!
//! [`RefreshWorker`] owns a spawned task that runs an incremental sync on
//! every tick and whatever [`RefreshTask`] is submitted in between. Stopping
//! the worker drops any sync still in flight; nothing is committed for it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::service::CatalogService;

const QUEUE_CAPACITY: usize = 16;

/// On-demand refresh requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTask {
    Incremental,
    Full,
}

/// Runs timed syncs against a [`CatalogService`]. An empty catalog is first
/// restored from the local snapshot.
struct Refresher {
    service: Arc<CatalogService>,
    timeout: Duration,
}

impl Refresher {
    async fn refresh(&self, full_refresh: bool) {
        if self.service.is_empty() {
            match self.service.read_local_snapshot() {
                Ok(true) => debug!(count = self.service.count(), "restored catalog snapshot"),
                Ok(false) => {}
                Err(SyncError::SyncAlreadyInProgress) => {
                    debug!("sync already in progress; skipping refresh");
                    return;
                }
                Err(err) => warn!(error = %err, "failed to restore catalog snapshot"),
            }
        }

        match self
            .service
            .sync_with_timeout(full_refresh, self.timeout)
            .await
        {
            Ok(report) => info!(
                fetched = report.fetched,
                full_refresh = report.full_refresh,
                "background refresh complete"
            ),
            Err(SyncError::SyncAlreadyInProgress) => {
                debug!("sync already in progress; skipping refresh");
            }
            Err(err) => warn!(error = %err, retryable = err.is_retryable(), "background refresh failed"),
        }
    }
}

async fn refresh_loop(
    refresher: Refresher,
    mut rx: mpsc::Receiver<RefreshTask>,
    shutdown: CancellationToken,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately.
    ticker.tick().await;

    loop {
        let full_refresh = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            task = rx.recv() => match task {
                Some(task) => task == RefreshTask::Full,
                None => break,
            },
            _ = ticker.tick() => false,
        };

        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!("refresh interrupted by shutdown");
                break;
            }
            () = refresher.refresh(full_refresh) => {}
        }
    }
    debug!("refresh worker stopped");
}

pub struct RefreshWorker {
    tx: Option<mpsc::Sender<RefreshTask>>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RefreshWorker {
    /// Spawns the worker. The first tick fires one full `interval` after
    /// start; each sync is bounded by `timeout`.
    #[must_use]
    pub fn start(service: Arc<CatalogService>, interval: Duration, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let shutdown = CancellationToken::new();
        let refresher = Refresher { service, timeout };
        let handle = tokio::spawn(refresh_loop(refresher, rx, shutdown.clone(), interval));

        Self {
            tx: Some(tx),
            shutdown,
            handle: Some(handle),
        }
    }

    /// Queues a refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has been stopped.
    pub async fn submit(&self, task: RefreshTask) -> anyhow::Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("refresh worker not running"))?;
        tx.send(task)
            .await
            .map_err(|_| anyhow::anyhow!("refresh worker channel closed"))
    }

    /// Stops the worker, dropping any sync in flight, and waits for the task.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "refresh worker task failed");
            }
        }
    }
}

/// Starts a refresh worker ticking at `interval`.
#[must_use]
pub fn spawn_refresh_worker(
    service: Arc<CatalogService>,
    interval: Duration,
    timeout: Duration,
) -> RefreshWorker {
    RefreshWorker::start(service, interval, timeout)
}
