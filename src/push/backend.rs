use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::platform::token::CsrfTokenProvider;
use crate::push::constants::{
    CSRF_HEADER, DEFAULT_STATUS_PATH, DEFAULT_SUBSCRIBE_PATH, DEFAULT_TEST_PATH,
    DEFAULT_UNSUBSCRIBE_PATH, DEFAULT_VAPID_KEY_PATH,
};
use crate::push::error::{
    backend_rejection, internal_error, invalid_argument, network_failure, PushResult,
};
use crate::push::types::{BackendStatus, RegistrationRequest, SendTestReport, TestNotification};

/// Remote registry of push subscriptions.
#[async_trait]
pub trait PushBackend: Send + Sync {
    async fn vapid_public_key(&self) -> PushResult<String>;

    async fn register(&self, registration: &RegistrationRequest) -> PushResult<()>;

    async fn unregister(&self, endpoint: &str) -> PushResult<()>;

    async fn send_test(&self, notification: &TestNotification) -> PushResult<SendTestReport>;

    /// Registration status, scoped to `endpoint` when given.
    async fn status(&self, endpoint: Option<&str>) -> PushResult<BackendStatus>;
}

/// Paths of the backend push API, relative to the backend base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushEndpoints {
    pub vapid_key: String,
    pub subscribe: String,
    pub unsubscribe: String,
    pub test: String,
    pub status: String,
}

impl Default for PushEndpoints {
    fn default() -> Self {
        Self {
            vapid_key: DEFAULT_VAPID_KEY_PATH.to_string(),
            subscribe: DEFAULT_SUBSCRIBE_PATH.to_string(),
            unsubscribe: DEFAULT_UNSUBSCRIBE_PATH.to_string(),
            test: DEFAULT_TEST_PATH.to_string(),
            status: DEFAULT_STATUS_PATH.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct VapidKeyResponse {
    #[serde(rename = "vapidPublicKey", alias = "publicKey")]
    vapid_public_key: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct UnregisterRequest<'a> {
    endpoint: &'a str,
}

/// [`PushBackend`] speaking JSON over HTTP.
///
/// Mutating calls carry the anti-forgery token from the injected provider in the
/// `X-CSRFToken` header.
#[derive(Clone)]
pub struct HttpPushBackend {
    http: Client,
    base_url: Url,
    endpoints: PushEndpoints,
    csrf: Arc<dyn CsrfTokenProvider>,
}

impl HttpPushBackend {
    pub fn new(base_url: &str, csrf: Arc<dyn CsrfTokenProvider>) -> PushResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| invalid_argument(format!("Invalid backend URL '{base_url}': {err}")))?;
        let http = Client::builder()
            .user_agent(format!("pwa-resilience/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| internal_error(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            base_url,
            endpoints: PushEndpoints::default(),
            csrf,
        })
    }

    pub fn with_endpoints(mut self, endpoints: PushEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn endpoints(&self) -> &PushEndpoints {
        &self.endpoints
    }

    fn endpoint(&self, path: &str) -> PushResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| invalid_argument(format!("Invalid push endpoint '{path}': {err}")))
    }

    async fn mutation_headers(&self) -> PushResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let token = self
            .csrf
            .csrf_token()
            .await
            .map_err(|err| internal_error(format!("Failed to obtain CSRF token: {err}")))?;
        if let Some(token) = token {
            let value = HeaderValue::from_str(&token)
                .map_err(|err| invalid_argument(format!("Invalid CSRF token: {err}")))?;
            headers.insert(HeaderName::from_static("x-csrftoken"), value);
        } else {
            log::debug!("no {CSRF_HEADER} token available for push request");
        }
        Ok(headers)
    }

    async fn check(&self, response: Response, action: &str) -> PushResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        let detail = serde_json::from_slice::<ErrorResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.error)
            .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());
        let message = if detail.is_empty() {
            format!("{action} failed with status {status}")
        } else {
            format!("{action} failed with status {status}: {detail}")
        };
        if status.is_server_error() {
            return Err(network_failure(message));
        }
        Err(backend_rejection(message))
    }

    async fn parse<T: DeserializeOwned>(&self, response: Response, action: &str) -> PushResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|err| network_failure(format!("Failed to read {action} response: {err}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|err| internal_error(format!("Failed to parse {action} response: {err}")))
    }
}

#[async_trait]
impl PushBackend for HttpPushBackend {
    async fn vapid_public_key(&self) -> PushResult<String> {
        let url = self.endpoint(&self.endpoints.vapid_key)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| network_failure(err.to_string()))?;
        let response = self.check(response, "VAPID key request").await?;
        let parsed: VapidKeyResponse = self.parse(response, "VAPID key").await?;
        Ok(parsed.vapid_public_key)
    }

    async fn register(&self, registration: &RegistrationRequest) -> PushResult<()> {
        let url = self.endpoint(&self.endpoints.subscribe)?;
        let headers = self.mutation_headers().await?;
        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(registration)
            .send()
            .await
            .map_err(|err| network_failure(err.to_string()))?;
        self.check(response, "Subscription registration").await?;
        Ok(())
    }

    async fn unregister(&self, endpoint: &str) -> PushResult<()> {
        let url = self.endpoint(&self.endpoints.unsubscribe)?;
        let headers = self.mutation_headers().await?;
        let response = self
            .http
            .delete(url)
            .headers(headers)
            .json(&UnregisterRequest { endpoint })
            .send()
            .await
            .map_err(|err| network_failure(err.to_string()))?;
        self.check(response, "Subscription removal").await?;
        Ok(())
    }

    async fn send_test(&self, notification: &TestNotification) -> PushResult<SendTestReport> {
        let url = self.endpoint(&self.endpoints.test)?;
        let headers = self.mutation_headers().await?;
        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(notification)
            .send()
            .await
            .map_err(|err| network_failure(err.to_string()))?;
        let response = self.check(response, "Test notification").await?;
        self.parse(response, "test notification").await
    }

    async fn status(&self, endpoint: Option<&str>) -> PushResult<BackendStatus> {
        let mut url = self.endpoint(&self.endpoints.status)?;
        if let Some(endpoint) = endpoint {
            url.query_pairs_mut().append_pair("endpoint", endpoint);
        }
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| network_failure(err.to_string()))?;
        let response = self.check(response, "Status request").await?;
        self.parse(response, "status").await
    }
}
