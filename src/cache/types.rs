use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use url::Url;

/// Name of the cache store that owns the current generation of cached resources.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheVersion(String);

impl CacheVersion {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How a request crosses origin boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestMode {
    SameOrigin,
    Cors,
    /// Cross-origin request whose response body stays opaque to the worker.
    NoCors,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheRequest {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
}

impl CacheRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            mode: RequestMode::SameOrigin,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(&self.method, &self.url)
    }
}

/// Lookup key of a cache entry: upper-cased method plus absolute URL without fragment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    method: String,
    url: String,
}

impl CacheKey {
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.to_ascii_uppercase(),
            url: url.into(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    Basic,
    Cors,
    Opaque,
}

/// A response as stored in, or replayed from, a cache store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedResponse {
    pub url: String,
    /// HTTP status. Opaque responses always report `0`.
    pub status: u16,
    pub response_type: ResponseType,
    pub headers: BTreeMap<String, String>,
    body: Bytes,
}

impl CachedResponse {
    pub fn new(
        url: impl Into<String>,
        status: u16,
        response_type: ResponseType,
        body: impl Into<Bytes>,
    ) -> Self {
        let status = if response_type == ResponseType::Opaque {
            0
        } else {
            status
        };
        Self {
            url: url.into(),
            status,
            response_type,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn opaque(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(url, 0, ResponseType::Opaque, body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_opaque(&self) -> bool {
        self.response_type == ResponseType::Opaque
    }

    /// Readable body; `None` for opaque responses.
    pub fn body(&self) -> Option<&Bytes> {
        (!self.is_opaque()).then_some(&self.body)
    }

    /// Raw bytes handed back to the page, including opaque bodies.
    pub fn replay_body(&self) -> Bytes {
        self.body.clone()
    }
}

/// Where `handle_fetch` obtained the response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchOutcome {
    pub response: CachedResponse,
    pub source: FetchSource,
}

/// Per-resource result of an install pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstallReport {
    pub version: String,
    pub cached: Vec<String>,
    pub failed: Vec<InstallFailure>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstallFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    /// Stale stores that could not be enumerated or deleted.
    pub leaked: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activated,
    Serving,
    Redundant,
}
