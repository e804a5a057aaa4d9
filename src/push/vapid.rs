use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_lock::Mutex as AsyncMutex;

use crate::push::backend::PushBackend;
use crate::push::constants::{VAPID_KEY_LENGTH, VAPID_KEY_STORAGE_KEY};
use crate::push::error::{internal_error, invalid_argument, PushResult};
use crate::push::logger::LOGGER;
use crate::util::base64::decode_key;

/// Small string store that survives reloads (local storage on the web, a file natively).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PushResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PushResult<()>;
    fn remove(&self, key: &str) -> PushResult<()>;
}

#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> PushResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PushResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PushResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Stores every key in one JSON object on disk.
#[derive(Clone, Debug)]
pub struct FileKeyValueStore {
    path: Arc<PathBuf>,
}

impl FileKeyValueStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Arc::new(path.as_ref().to_path_buf()),
        }
    }

    fn load(&self) -> PushResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&*self.path)
            .map_err(|err| internal_error(format!("Failed to read key store: {err}")))?;
        serde_json::from_str(&contents)
            .map_err(|err| internal_error(format!("Corrupted key store: {err}")))
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> PushResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| internal_error(format!("Failed to create key store directory: {err}")))?;
        }
        let serialized = serde_json::to_string(entries)
            .map_err(|err| internal_error(format!("Failed to serialize key store: {err}")))?;
        fs::write(&*self.path, serialized)
            .map_err(|err| internal_error(format!("Failed to write key store: {err}")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> PushResult<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PushResult<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> PushResult<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Application server key used to create push subscriptions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VapidKey {
    encoded: String,
    bytes: Vec<u8>,
}

impl VapidKey {
    /// Parses a URL-safe base64 P-256 public key. Padding and the standard alphabet are
    /// tolerated.
    pub fn parse(encoded: &str) -> PushResult<Self> {
        let bytes = decode_key(encoded)
            .map_err(|err| invalid_argument(format!("Invalid VAPID key encoding: {err}")))?;
        if bytes.len() != VAPID_KEY_LENGTH || bytes[0] != 0x04 {
            return Err(invalid_argument(format!(
                "VAPID key must be an uncompressed P-256 point ({VAPID_KEY_LENGTH} bytes), got {} bytes",
                bytes.len()
            )));
        }
        Ok(Self {
            encoded: encoded.trim().to_string(),
            bytes,
        })
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Resolves the VAPID key from memory, then the persisted copy, then the backend.
///
/// A key obtained from the backend is persisted; it is only fetched again when the
/// caller forces a refresh. Concurrent lookups wait on one another so the backend is
/// asked at most once.
pub struct VapidKeyCache {
    store: Arc<dyn KeyValueStore>,
    memory: AsyncMutex<Option<VapidKey>>,
}

impl VapidKeyCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            memory: AsyncMutex::new(None),
        }
    }

    pub async fn get(&self, backend: &dyn PushBackend, force_refresh: bool) -> PushResult<VapidKey> {
        let mut memory = self.memory.lock().await;
        if !force_refresh {
            if let Some(key) = memory.clone() {
                return Ok(key);
            }
            if let Some(key) = self.persisted() {
                *memory = Some(key.clone());
                return Ok(key);
            }
        }

        let encoded = backend.vapid_public_key().await?;
        let key = VapidKey::parse(&encoded)?;
        if let Err(err) = self.store.set(VAPID_KEY_STORAGE_KEY, key.encoded()) {
            LOGGER.warn(format!("Failed to persist VAPID key: {err}"));
        }
        *memory = Some(key.clone());
        Ok(key)
    }

    fn persisted(&self) -> Option<VapidKey> {
        let stored = match self.store.get(VAPID_KEY_STORAGE_KEY) {
            Ok(stored) => stored?,
            Err(err) => {
                LOGGER.warn(format!("Failed to read persisted VAPID key: {err}"));
                return None;
            }
        };
        match VapidKey::parse(&stored) {
            Ok(key) => Some(key),
            Err(err) => {
                LOGGER.warn(format!("Ignoring persisted VAPID key: {err}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_vapid_key, FakeBackend};
    use crate::util::base64::url_safe_encode;

    #[test]
    fn parse_validates_key_shape() {
        let key = VapidKey::parse(&sample_vapid_key()).unwrap();
        assert_eq!(key.as_bytes().len(), 65);
        assert_eq!(key.as_bytes()[0], 0x04);

        let padded = format!("{}=", sample_vapid_key());
        assert!(VapidKey::parse(&padded).is_ok());

        let short = url_safe_encode(&[0x04, 1, 2, 3]);
        assert_eq!(
            VapidKey::parse(&short).unwrap_err().code_str(),
            "push/invalid-argument"
        );
        assert!(VapidKey::parse("not base64 !").is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn backend_is_consulted_once_then_persisted() {
        let backend = FakeBackend::new();
        let store = Arc::new(InMemoryKeyValueStore::new());
        let cache = VapidKeyCache::new(store.clone());

        let first = cache.get(&backend, false).await.unwrap();
        let second = cache.get(&backend, false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.vapid_calls(), 1);
        assert_eq!(
            store.get(VAPID_KEY_STORAGE_KEY).unwrap().as_deref(),
            Some(first.encoded())
        );

        let restarted = VapidKeyCache::new(store);
        restarted.get(&backend, false).await.unwrap();
        assert_eq!(backend.vapid_calls(), 1);

        restarted.get(&backend, true).await.unwrap();
        assert_eq!(backend.vapid_calls(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn corrupted_persisted_key_is_refetched() {
        let backend = FakeBackend::new();
        let store = Arc::new(InMemoryKeyValueStore::new());
        store.set(VAPID_KEY_STORAGE_KEY, "AAAA").unwrap();
        let cache = VapidKeyCache::new(store);

        cache.get(&backend, false).await.unwrap();
        assert_eq!(backend.vapid_calls(), 1);
    }

    #[test]
    fn file_store_survives_reopen() {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "pwa_resilience_kv_{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));

        let store = FileKeyValueStore::new(&path);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();

        let reopened = FileKeyValueStore::new(&path);
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
        let _ = fs::remove_file(path);
    }
}
