use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method};
use url::Origin;

use crate::cache::error::{invalid_url, network_failure, CacheResult};
use crate::cache::types::{CacheRequest, CachedResponse, RequestMode, ResponseType};

/// Performs the network leg of a fetch on behalf of the cache controller.
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    /// Resolves with whatever the server answered (any status). Fails only when no
    /// response was obtained at all.
    async fn fetch(&self, request: &CacheRequest) -> CacheResult<CachedResponse>;
}

pub type SharedNetworkFetcher = Arc<dyn NetworkFetcher>;

/// [`NetworkFetcher`] backed by `reqwest`.
///
/// Responses from the worker's own origin are `Basic`; cross-origin responses are
/// `Cors`, or `Opaque` when the request was issued in no-cors mode.
#[derive(Clone, Debug)]
pub struct HttpNetworkFetcher {
    http: Client,
    origin: Origin,
}

impl HttpNetworkFetcher {
    pub fn new(origin: Origin) -> CacheResult<Self> {
        let http = Client::builder()
            .user_agent(format!("pwa-resilience/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| network_failure(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self { http, origin })
    }

    fn response_type(&self, request: &CacheRequest) -> ResponseType {
        if request.url.origin() == self.origin {
            ResponseType::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

#[async_trait]
impl NetworkFetcher for HttpNetworkFetcher {
    async fn fetch(&self, request: &CacheRequest) -> CacheResult<CachedResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|err| invalid_url(format!("Invalid method '{}': {err}", request.method)))?;
        let response = self
            .http
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(|err| network_failure(format!("Fetch of {} failed: {err}", request.url)))?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|err| network_failure(format!("Failed to read {}: {err}", request.url)))?;

        let response_type = self.response_type(request);
        let mut cached = CachedResponse::new(url, status, response_type, body);
        if response_type != ResponseType::Opaque {
            cached.headers = headers;
        }
        Ok(cached)
    }
}
