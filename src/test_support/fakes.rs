use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::cache::error::network_failure as fetch_failure;
use crate::cache::{
    CacheRequest, CacheResult, CachedResponse, NetworkFetcher, RequestMode, ResponseType,
};
use crate::page::PageLocation;
use crate::permission::error::{prompt_failed, PermissionResult};
use crate::permission::{EnvironmentProbe, EnvironmentSignals, NotificationPlatform, PermissionState};
use crate::push::error::{backend_rejection, network_failure, PushResult};
use crate::push::{
    BackendStatus, PushBackend, PushPlatform, PushSubscriptionDetails, RegistrationRequest,
    SendTestReport, TestNotification,
};
use crate::util::base64::url_safe_encode;
use crate::worker::error::WorkerResult;
use crate::worker::{NotificationRequest, NotificationSink};

/// A well-formed uncompressed P-256 point, URL-safe base64 encoded.
pub fn sample_vapid_key() -> String {
    let mut raw = vec![0x04u8];
    raw.extend((1..=64u8).map(|byte| byte.wrapping_mul(3)));
    url_safe_encode(&raw)
}

/// Scripted network keyed by absolute URL. Unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<BTreeMap<String, Option<(u16, String)>>>,
    modes: Mutex<BTreeMap<String, RequestMode>>,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Some((status, body.to_string())));
    }

    pub fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), None);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Mode of the last request made for `url`.
    pub fn mode_of(&self, url: &str) -> Option<RequestMode> {
        self.modes.lock().unwrap().get(url).copied()
    }
}

#[async_trait]
impl NetworkFetcher for FakeNetwork {
    async fn fetch(&self, request: &CacheRequest) -> CacheResult<CachedResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.url.as_str().to_string();
        self.modes.lock().unwrap().insert(url.clone(), request.mode);
        let route = self.routes.lock().unwrap().get(&url).cloned();
        let Some((status, body)) = route.flatten() else {
            return Err(fetch_failure(format!("Failed to fetch {url}")));
        };
        let response_type = match request.mode {
            RequestMode::SameOrigin => ResponseType::Basic,
            RequestMode::Cors => ResponseType::Cors,
            RequestMode::NoCors => ResponseType::Opaque,
        };
        Ok(CachedResponse::new(url, status, response_type, body))
    }
}

/// Notification permission store whose prompt resolves to a scripted answer.
pub struct FakeNotifications {
    permission: Mutex<PermissionState>,
    answer: Mutex<PermissionState>,
    fail_prompt: AtomicBool,
    prompts: AtomicUsize,
}

impl FakeNotifications {
    pub fn new(permission: PermissionState) -> Self {
        Self {
            permission: Mutex::new(permission),
            answer: Mutex::new(PermissionState::Granted),
            fail_prompt: AtomicBool::new(false),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn answer_with(&self, answer: PermissionState) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn fail_prompt(&self) {
        self.fail_prompt.store(true, Ordering::SeqCst);
    }

    pub fn set_permission(&self, permission: PermissionState) {
        *self.permission.lock().unwrap() = permission;
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationPlatform for FakeNotifications {
    fn permission(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> PermissionResult<PermissionState> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.fail_prompt.load(Ordering::SeqCst) {
            return Err(prompt_failed("Prompt blocked by the browser"));
        }
        let answer = *self.answer.lock().unwrap();
        self.set_permission(answer);
        Ok(answer)
    }
}

pub struct FakeEnvironment {
    signals: Mutex<EnvironmentSignals>,
    related_apps: AtomicUsize,
    probes: AtomicUsize,
}

impl FakeEnvironment {
    pub fn new(signals: EnvironmentSignals) -> Self {
        Self {
            signals: Mutex::new(signals),
            related_apps: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn set_signals(&self, signals: EnvironmentSignals) {
        *self.signals.lock().unwrap() = signals;
    }

    pub fn set_related_apps(&self, count: usize) {
        self.related_apps.store(count, Ordering::SeqCst);
    }

    /// Number of related-apps queries made so far.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnvironmentProbe for FakeEnvironment {
    fn signals(&self) -> EnvironmentSignals {
        self.signals.lock().unwrap().clone()
    }

    async fn installed_related_apps(&self) -> usize {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.related_apps.load(Ordering::SeqCst)
    }
}

pub struct FakePushPlatform {
    supported: AtomicBool,
    subscription: Mutex<Option<PushSubscriptionDetails>>,
    last_key: Mutex<Option<Vec<u8>>>,
    subscribe_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl Default for FakePushPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePushPlatform {
    pub fn new() -> Self {
        Self {
            supported: AtomicBool::new(true),
            subscription: Mutex::new(None),
            last_key: Mutex::new(None),
            subscribe_calls: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    fn mint(&self) -> PushSubscriptionDetails {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        PushSubscriptionDetails {
            endpoint: format!("https://push.example/send/device-{id}"),
            p256dh: format!("p256dh-{id}"),
            auth: format!("auth-{id}"),
        }
    }

    /// Places a subscription on the platform as if a previous session created it.
    pub fn install_subscription(&self) -> String {
        let subscription = self.mint();
        let endpoint = subscription.endpoint.clone();
        *self.subscription.lock().unwrap() = Some(subscription);
        endpoint
    }

    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::SeqCst);
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.lock().unwrap().is_some()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn last_key(&self) -> Option<Vec<u8>> {
        self.last_key.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushPlatform for FakePushPlatform {
    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    async fn get_subscription(&self) -> PushResult<Option<PushSubscriptionDetails>> {
        Ok(self.subscription.lock().unwrap().clone())
    }

    async fn subscribe(&self, application_server_key: &[u8]) -> PushResult<PushSubscriptionDetails> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_key.lock().unwrap() = Some(application_server_key.to_vec());
        let subscription = self.mint();
        *self.subscription.lock().unwrap() = Some(subscription.clone());
        Ok(subscription)
    }

    async fn unsubscribe(&self) -> PushResult<bool> {
        Ok(self.subscription.lock().unwrap().take().is_some())
    }
}

/// In-memory push backend keeping the set of registered endpoints.
#[derive(Default)]
pub struct FakeBackend {
    endpoints: Mutex<BTreeSet<String>>,
    registrations: Mutex<Vec<RegistrationRequest>>,
    unregistered: Mutex<Vec<String>>,
    test_notifications: Mutex<Vec<TestNotification>>,
    reject_registrations: AtomicBool,
    ignore_registrations: AtomicBool,
    fail_unregister: AtomicBool,
    offline: AtomicBool,
    calls: AtomicUsize,
    vapid_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `endpoint` as registered without recording a registration call.
    pub fn register_endpoint(&self, endpoint: &str) {
        self.endpoints.lock().unwrap().insert(endpoint.to_string());
    }

    pub fn registrations(&self) -> Vec<RegistrationRequest> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn unregistered(&self) -> Vec<String> {
        self.unregistered.lock().unwrap().clone()
    }

    pub fn test_notifications(&self) -> Vec<TestNotification> {
        self.test_notifications.lock().unwrap().clone()
    }

    pub fn reject_registrations(&self) {
        self.reject_registrations.store(true, Ordering::SeqCst);
    }

    /// Accepts registrations without storing them, as a backend losing writes would.
    pub fn ignore_registrations(&self) {
        self.ignore_registrations.store(true, Ordering::SeqCst);
    }

    pub fn fail_unregister(&self) {
        self.fail_unregister.store(true, Ordering::SeqCst);
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vapid_calls(&self) -> usize {
        self.vapid_calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> PushResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(network_failure("Backend unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl PushBackend for FakeBackend {
    async fn vapid_public_key(&self) -> PushResult<String> {
        self.enter()?;
        self.vapid_calls.fetch_add(1, Ordering::SeqCst);
        Ok(sample_vapid_key())
    }

    async fn register(&self, registration: &RegistrationRequest) -> PushResult<()> {
        self.enter()?;
        if self.reject_registrations.load(Ordering::SeqCst) {
            return Err(backend_rejection("Invalid subscription"));
        }
        self.registrations.lock().unwrap().push(registration.clone());
        if !self.ignore_registrations.load(Ordering::SeqCst) {
            self.register_endpoint(&registration.endpoint);
        }
        Ok(())
    }

    async fn unregister(&self, endpoint: &str) -> PushResult<()> {
        self.enter()?;
        if self.fail_unregister.load(Ordering::SeqCst) {
            return Err(backend_rejection("Unregister failed"));
        }
        self.unregistered.lock().unwrap().push(endpoint.to_string());
        self.endpoints.lock().unwrap().remove(endpoint);
        Ok(())
    }

    async fn send_test(&self, notification: &TestNotification) -> PushResult<SendTestReport> {
        self.enter()?;
        self.test_notifications
            .lock()
            .unwrap()
            .push(notification.clone());
        Ok(SendTestReport {
            sent: self.endpoints.lock().unwrap().len() as u32,
            errors: Vec::new(),
        })
    }

    async fn status(&self, endpoint: Option<&str>) -> PushResult<BackendStatus> {
        self.enter()?;
        let endpoints = self.endpoints.lock().unwrap();
        Ok(BackendStatus {
            subscribed: endpoint.is_some_and(|endpoint| endpoints.contains(endpoint)),
            devices: endpoints.len() as u32,
        })
    }
}

#[derive(Default)]
pub struct FakeNotificationSink {
    shown: Mutex<Vec<NotificationRequest>>,
}

impl FakeNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<NotificationRequest> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for FakeNotificationSink {
    async fn show(&self, request: &NotificationRequest) -> WorkerResult<()> {
        self.shown.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Page location on `https://app.test` that records navigations and follows them.
pub struct FakeLocation {
    href: Mutex<Url>,
    navigations: Mutex<Vec<String>>,
}

impl FakeLocation {
    pub fn new(path: &str) -> Self {
        let origin = Url::parse("https://app.test/").unwrap();
        Self {
            href: Mutex::new(origin.join(path).unwrap()),
            navigations: Mutex::new(Vec::new()),
        }
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn pathname(&self) -> String {
        self.href.lock().unwrap().path().to_string()
    }
}

impl PageLocation for FakeLocation {
    fn href(&self) -> String {
        self.href.lock().unwrap().to_string()
    }

    fn navigate(&self, url: &str) {
        self.navigations.lock().unwrap().push(url.to_string());
        let mut href = self.href.lock().unwrap();
        if let Ok(next) = href.join(url) {
            *href = next;
        }
    }
}
