//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Root of the public site; box art and store page paths are relative to it.
pub const DEFAULT_SITE_BASE_URL: &str = "https://www.nintendo.com";

/// Top-level configuration for a [`CatalogService`](crate::service::CatalogService).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the catalog API. Endpoint paths are joined onto it.
    pub api_base_url: String,
    /// Base URL used to build absolute box art and store page links.
    pub site_base_url: String,
    /// Directory holding the catalog snapshot and settings files.
    pub data_dir: PathBuf,
    /// Timeout for a single HTTP request.
    pub request_timeout: Duration,
    /// Upper bound on a whole sync run, all pages included.
    pub sync_timeout: Duration,
    /// Maximum number of pages fetched in one sync run.
    pub max_pages: usize,
    /// Number of detail records kept in memory.
    pub details_cache_capacity: usize,
    /// Interval between background incremental syncs.
    pub refresh_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/".to_string(),
            site_base_url: DEFAULT_SITE_BASE_URL.to_string(),
            data_dir: PathBuf::from("data"),
            request_timeout: Duration::from_secs(30),
            sync_timeout: Duration::from_secs(120),
            max_pages: 1000,
            details_cache_capacity: 256,
            refresh_interval: Duration::from_secs(15 * 60),
        }
    }
}
