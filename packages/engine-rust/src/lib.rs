//! Wishlist Engine — catalog sync, view pipeline, favorites and local persistence.

pub mod catalog;
pub mod config;
pub mod details;
pub mod error;
pub mod favorites;
pub mod service;
pub mod source;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod view;
pub mod worker;

pub use catalog::{CatalogSnapshot, CatalogStore, MergeReport};
pub use config::EngineConfig;
pub use error::{FavoritesError, StoreError, SyncError};
pub use favorites::{FavoritesChange, FavoritesSummary};
pub use service::CatalogService;
pub use source::{HttpListingSource, ListingSource, PageRequest};
pub use store::{FileStore, LocalStore, MemoryStore};
pub use sync::{CatalogChange, CatalogObserver, SyncEngine, SyncReport};
pub use worker::{spawn_refresh_worker, RefreshTask, RefreshWorker};
