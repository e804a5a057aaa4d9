use std::sync::{Arc, Mutex};

use futures::future::join_all;
use url::Url;

use crate::cache::error::{invalid_url, CacheResult};
use crate::cache::logger::LOGGER;
use crate::cache::network::SharedNetworkFetcher;
use crate::cache::storage::SharedCacheStorage;
use crate::cache::types::{
    ActivateReport, CacheRequest, CacheVersion, CachedResponse, FetchOutcome, FetchSource,
    InstallFailure, InstallReport, LifecycleState, RequestMode, ResponseType,
};
use crate::platform::runtime::spawn_detached;

/// Drives the install / activate / serve lifecycle of one worker generation.
///
/// A controller owns exactly one [`CacheVersion`]. Installing populates the store of
/// that name, activating purges every other store, and fetches are answered cache-first
/// from the current store.
#[derive(Clone)]
pub struct CacheController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    version: CacheVersion,
    scope: Url,
    storage: SharedCacheStorage,
    network: SharedNetworkFetcher,
    state: Mutex<ControllerState>,
}

struct ControllerState {
    lifecycle: LifecycleState,
    skip_waiting: bool,
}

impl CacheController {
    pub fn new(
        version: CacheVersion,
        scope: Url,
        storage: SharedCacheStorage,
        network: SharedNetworkFetcher,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                version,
                scope,
                storage,
                network,
                state: Mutex::new(ControllerState {
                    lifecycle: LifecycleState::Parsed,
                    skip_waiting: false,
                }),
            }),
        }
    }

    pub fn version(&self) -> &CacheVersion {
        &self.inner.version
    }

    pub fn scope(&self) -> &Url {
        &self.inner.scope
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.inner.state.lock().unwrap().lifecycle
    }

    /// Whether install asked to take over from a previous generation without waiting
    /// for its pages to close.
    pub fn skip_waiting_requested(&self) -> bool {
        self.inner.state.lock().unwrap().skip_waiting
    }

    /// Resolves a manifest entry (absolute, root-relative or `./relative`) against the
    /// worker scope.
    pub fn resolve(&self, entry: &str) -> CacheResult<Url> {
        self.inner
            .scope
            .join(entry)
            .map_err(|err| invalid_url(format!("Invalid manifest entry '{entry}': {err}")))
    }

    /// Builds the request used to precache `url`: same-origin resources are fetched
    /// normally, everything else in no-cors mode.
    pub fn precache_request(&self, url: Url) -> CacheRequest {
        let mode = if url.origin() == self.inner.scope.origin() {
            RequestMode::SameOrigin
        } else {
            RequestMode::NoCors
        };
        CacheRequest::get(url).with_mode(mode)
    }

    /// Precaches every manifest entry.
    ///
    /// Resources are fetched concurrently. A resource that cannot be fetched, or that
    /// answers with a non-success same-origin status, is recorded in
    /// [`InstallReport::failed`] and does not fail the install. The only fatal error is
    /// failing to open the store.
    pub async fn install<S: AsRef<str>>(&self, manifest: &[S]) -> CacheResult<InstallReport> {
        self.set_lifecycle(LifecycleState::Installing);
        let name = self.inner.version.as_str();

        if let Err(err) = self.inner.storage.open(name).await {
            LOGGER.error(format!("Failed to open cache store {name}: {err}"));
            self.set_lifecycle(LifecycleState::Redundant);
            return Err(err);
        }

        let attempts = manifest
            .iter()
            .map(|entry| self.precache_entry(entry.as_ref()));
        let mut report = InstallReport {
            version: name.to_string(),
            ..Default::default()
        };
        for (entry, result) in join_all(attempts).await {
            match result {
                Ok(()) => report.cached.push(entry),
                Err(reason) => {
                    LOGGER.warn(format!("Failed to precache {entry}: {reason}"));
                    report.failed.push(InstallFailure { url: entry, reason });
                }
            }
        }

        {
            let mut state = self.inner.state.lock().unwrap();
            state.lifecycle = LifecycleState::Installed;
            state.skip_waiting = true;
        }
        LOGGER.info(format!(
            "Installed {name}: {} cached, {} failed",
            report.cached.len(),
            report.failed.len()
        ));
        Ok(report)
    }

    async fn precache_entry(&self, entry: &str) -> (String, Result<(), String>) {
        let url = match self.resolve(entry) {
            Ok(url) => url,
            Err(err) => return (entry.to_string(), Err(err.to_string())),
        };
        let request = self.precache_request(url);
        let key_url = request.url.to_string();

        let response = match self.inner.network.fetch(&request).await {
            Ok(response) => response,
            Err(err) => return (key_url, Err(err.to_string())),
        };
        if !(response.is_ok() || response.is_opaque()) {
            return (key_url, Err(format!("status {}", response.status)));
        }
        let result = self
            .inner
            .storage
            .put(self.inner.version.as_str(), request.key(), response)
            .await
            .map_err(|err| err.to_string());
        (key_url, result)
    }

    /// Removes every cache store whose name is not the current version.
    ///
    /// Never fails: stores that cannot be enumerated or deleted are logged and reported
    /// in [`ActivateReport::leaked`].
    pub async fn activate(&self) -> ActivateReport {
        let current = self.inner.version.as_str();
        let mut report = ActivateReport::default();

        let names = match self.inner.storage.keys().await {
            Ok(names) => names,
            Err(err) => {
                LOGGER.error(format!("Failed to enumerate cache stores: {err}"));
                Vec::new()
            }
        };

        for name in names.into_iter().filter(|name| name != current) {
            match self.inner.storage.delete(&name).await {
                Ok(_) => {
                    LOGGER.info(format!("Deleted stale cache store {name}"));
                    report.deleted.push(name);
                }
                Err(err) => {
                    LOGGER.warn(format!("Failed to delete cache store {name}: {err}"));
                    report.leaked.push(name);
                }
            }
        }

        self.set_lifecycle(LifecycleState::Activated);
        report
    }

    /// Answers a request cache-first.
    ///
    /// On a miss the network response is returned as-is. Successful same-origin `GET`
    /// responses are copied into the current store by a detached task; failures of that
    /// write are logged only. Network failures propagate to the caller.
    pub async fn handle_fetch(&self, request: CacheRequest) -> CacheResult<FetchOutcome> {
        let name = self.inner.version.as_str();
        if request.is_get() {
            match self.inner.storage.match_entry(name, &request.key()).await {
                Ok(Some(response)) => {
                    self.set_lifecycle(LifecycleState::Serving);
                    log::debug!("cache hit for {}", request.url);
                    return Ok(FetchOutcome {
                        response,
                        source: FetchSource::Cache,
                    });
                }
                Ok(None) => {}
                Err(err) => LOGGER.warn(format!("Cache lookup for {} failed: {err}", request.url)),
            }
        }

        let response = self.inner.network.fetch(&request).await?;
        self.set_lifecycle(LifecycleState::Serving);
        if request.is_get() && is_cacheable(&response) {
            self.store_in_background(request, response.clone());
        }
        Ok(FetchOutcome {
            response,
            source: FetchSource::Network,
        })
    }

    fn store_in_background(&self, request: CacheRequest, response: CachedResponse) {
        let storage = Arc::clone(&self.inner.storage);
        let name = self.inner.version.as_str().to_string();
        spawn_detached(async move {
            let key = request.key();
            if let Err(err) = storage.put(&name, key, response).await {
                LOGGER.warn(format!("Failed to cache {}: {err}", request.url));
            }
        });
    }

    fn set_lifecycle(&self, lifecycle: LifecycleState) {
        let mut state = self.inner.state.lock().unwrap();
        // A controller never leaves Serving for an earlier state once it serves traffic.
        if state.lifecycle == LifecycleState::Serving && lifecycle == LifecycleState::Activated {
            return;
        }
        state.lifecycle = lifecycle;
    }
}

fn is_cacheable(response: &CachedResponse) -> bool {
    response.status == 200 && response.response_type == ResponseType::Basic
}
