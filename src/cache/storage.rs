use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::cache::error::{open_failed, storage_failed, CacheResult};
use crate::cache::types::{CacheKey, CachedResponse};

/// Named cache stores owned by the worker origin.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Opens the store, creating it when missing.
    async fn open(&self, name: &str) -> CacheResult<()>;

    async fn keys(&self) -> CacheResult<Vec<String>>;

    /// Removes a store and every entry in it. Returns `false` when no store existed.
    async fn delete(&self, name: &str) -> CacheResult<bool>;

    async fn match_entry(&self, name: &str, key: &CacheKey)
        -> CacheResult<Option<CachedResponse>>;

    /// Stores `response` under `key`, replacing any previous entry.
    async fn put(&self, name: &str, key: CacheKey, response: CachedResponse) -> CacheResult<()>;

    async fn entries(&self, name: &str) -> CacheResult<Vec<CacheKey>>;
}

pub type SharedCacheStorage = Arc<dyn CacheStorage>;

type Stores = BTreeMap<String, BTreeMap<CacheKey, CachedResponse>>;

/// Process-local cache storage.
#[derive(Default)]
pub struct InMemoryCacheStorage {
    stores: Mutex<Stores>,
    failing: Mutex<BTreeSet<String>>,
}

impl InMemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation on `name` fail, as a quota-exhausted or corrupted store would.
    pub fn fail_store(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    fn check(&self, name: &str) -> CacheResult<()> {
        if self.failing.lock().unwrap().contains(name) {
            return Err(storage_failed(format!("Cache store '{name}' is unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for InMemoryCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<()> {
        if self.failing.lock().unwrap().contains(name) {
            return Err(open_failed(format!("Unable to open cache store '{name}'")));
        }
        self.stores
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.stores.lock().unwrap().keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        self.check(name)?;
        Ok(self.stores.lock().unwrap().remove(name).is_some())
    }

    async fn match_entry(
        &self,
        name: &str,
        key: &CacheKey,
    ) -> CacheResult<Option<CachedResponse>> {
        self.check(name)?;
        Ok(self
            .stores
            .lock()
            .unwrap()
            .get(name)
            .and_then(|store| store.get(key))
            .cloned())
    }

    async fn put(&self, name: &str, key: CacheKey, response: CachedResponse) -> CacheResult<()> {
        self.check(name)?;
        self.stores
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .insert(key, response);
        Ok(())
    }

    async fn entries(&self, name: &str) -> CacheResult<Vec<CacheKey>> {
        self.check(name)?;
        Ok(self
            .stores
            .lock()
            .unwrap()
            .get(name)
            .map(|store| store.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::types::ResponseType;
    use url::Url;

    fn key(path: &str) -> CacheKey {
        CacheKey::new("GET", &Url::parse("https://app.test/").unwrap().join(path).unwrap())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn put_replaces_previous_entry() {
        let storage = InMemoryCacheStorage::new();
        storage.open("v1").await.unwrap();
        storage
            .put("v1", key("/a"), CachedResponse::new("/a", 200, ResponseType::Basic, "old"))
            .await
            .unwrap();
        storage
            .put("v1", key("/a"), CachedResponse::new("/a", 200, ResponseType::Basic, "new"))
            .await
            .unwrap();

        let hit = storage.match_entry("v1", &key("/a")).await.unwrap().unwrap();
        assert_eq!(hit.body().unwrap().as_ref(), b"new");
        assert_eq!(storage.entries("v1").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failing_store_cannot_be_opened() {
        let storage = InMemoryCacheStorage::new();
        storage.fail_store("broken");
        let err = storage.open("broken").await.unwrap_err();
        assert_eq!(err.code_str(), "cache/open-failed");
        assert!(storage.delete("broken").await.is_err());
        assert!(storage.keys().await.unwrap().is_empty());
    }
}
