//! Install, activate and cache-first serving for one worker generation.
mod constants;
mod controller;
pub mod error;
mod logger;
mod network;
mod storage;
mod types;

pub use constants::{CACHE_COMPONENT_NAME, DEFAULT_CACHE_VERSION, DEFAULT_MANIFEST};
pub use controller::CacheController;
pub use error::{CacheError, CacheErrorCode, CacheResult};
pub use network::{HttpNetworkFetcher, NetworkFetcher, SharedNetworkFetcher};
pub use storage::{CacheStorage, InMemoryCacheStorage, SharedCacheStorage};
pub use types::{
    ActivateReport, CacheKey, CacheRequest, CacheVersion, CachedResponse, FetchOutcome,
    FetchSource, InstallFailure, InstallReport, LifecycleState, RequestMode, ResponseType,
};
