//! Error types for the sync engine, local store and favorites.

use std::path::PathBuf;
use std::time::Duration;

/// Failure of a local store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of a sync run or of a remote lookup.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to build request: {reason}")]
    RequestConstructionFailed { reason: String },
    #[error("transport failed: {0}")]
    TransportFailed(#[source] anyhow::Error),
    #[error("failed to decode response envelope: {reason}")]
    EnvelopeDecodeFailed { reason: String },
    #[error("continuation key is missing its id or timestamp")]
    NoContinuationKey,
    #[error("pagination exceeded {max_pages} pages")]
    PageLimitExceeded { max_pages: usize },
    #[error("a sync is already in progress")]
    SyncAlreadyInProgress,
    #[error("sync cancelled")]
    Cancelled,
    #[error("sync timed out after {}ms", .timeout.as_millis())]
    TimedOut { timeout: Duration },
    #[error("local store read failed: {0}")]
    LocalStoreReadFailed(#[source] StoreError),
    #[error("local store write failed: {0}")]
    LocalStoreWriteFailed(#[source] StoreError),
}

impl SyncError {
    /// Whether retrying the same call later can reasonably succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::TransportFailed(_) | SyncError::TimedOut { .. } | SyncError::Cancelled
        )
    }
}

/// Failure of a favorites command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FavoritesError {
    #[error("favorite index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("listing {id} is not in the catalog")]
    UnknownListing { id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(SyncError::TransportFailed(anyhow::anyhow!("reset")).is_retryable());
        assert!(SyncError::TimedOut {
            timeout: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!SyncError::SyncAlreadyInProgress.is_retryable());
        assert!(!SyncError::NoContinuationKey.is_retryable());
        assert!(!SyncError::EnvelopeDecodeFailed {
            reason: "no items".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn error_messages() {
        let err = SyncError::TimedOut {
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "sync timed out after 1500ms");

        let err = FavoritesError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "favorite index 4 out of range (len 2)");
    }
}
