use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::bus::{BusSubscription, MessageBus};
use crate::permission::{browser_name, PermissionGestureCoordinator, PermissionState};
use crate::platform::clock::SharedClock;
use crate::push::backend::PushBackend;
use crate::push::constants::PERMISSION_SETTLE_DELAY;
use crate::push::error::{
    backend_rejection, network_failure, permission_denied, precondition_failed, unsupported,
    PushError, PushResult,
};
use crate::push::logger::LOGGER;
use crate::push::platform::PushPlatform;
use crate::push::types::{
    PushState, PushStatus, PushSubscriptionDetails, RegistrationRequest, SendTestReport,
    TestNotification,
};
use crate::push::vapid::{KeyValueStore, VapidKeyCache};

type SubscribeFuture = Shared<BoxFuture<'static, PushResult<PushStatus>>>;

/// Collaborators of a [`PushSubscriptionManager`].
pub struct PushDependencies {
    pub platform: Arc<dyn PushPlatform>,
    pub backend: Arc<dyn PushBackend>,
    pub coordinator: PermissionGestureCoordinator,
    pub key_store: Arc<dyn KeyValueStore>,
    pub clock: SharedClock,
}

/// Keeps the browser subscription, the persisted VAPID key and the backend record
/// consistent.
///
/// Every public operation ends by publishing a [`PushStatus`] on the status bus,
/// including failed ones, which carry the error in [`PushStatus::last_error`].
#[derive(Clone)]
pub struct PushSubscriptionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    platform: Arc<dyn PushPlatform>,
    backend: Arc<dyn PushBackend>,
    coordinator: PermissionGestureCoordinator,
    vapid: VapidKeyCache,
    clock: SharedClock,
    status_bus: MessageBus<PushStatus>,
    state: Mutex<ManagerState>,
}

#[derive(Default)]
struct ManagerState {
    last_status: Option<PushStatus>,
    subscribe_in_flight: Option<(u64, SubscribeFuture)>,
    next_subscribe_id: u64,
}

impl PushSubscriptionManager {
    pub fn new(dependencies: PushDependencies) -> Self {
        let PushDependencies {
            platform,
            backend,
            coordinator,
            key_store,
            clock,
        } = dependencies;
        Self {
            inner: Arc::new(ManagerInner {
                platform,
                backend,
                coordinator,
                vapid: VapidKeyCache::new(key_store),
                clock,
                status_bus: MessageBus::new(),
                state: Mutex::new(ManagerState::default()),
            }),
        }
    }

    pub fn status_updates(&self) -> BusSubscription<PushStatus> {
        self.inner.status_bus.subscribe()
    }

    pub fn status_bus(&self) -> MessageBus<PushStatus> {
        self.inner.status_bus.clone()
    }

    /// Last status published, if any operation ran yet.
    pub fn last_status(&self) -> Option<PushStatus> {
        self.inner.state.lock().unwrap().last_status.clone()
    }

    /// Re-reads permission, the local subscription and the backend record.
    ///
    /// Never fails; read errors are reported in [`PushStatus::last_error`].
    pub async fn reconcile(&self) -> PushStatus {
        let status = self.inner.compute_status().await;
        self.inner.publish(status.clone());
        status
    }

    /// Subscribes this browser and registers the subscription with the backend.
    ///
    /// Concurrent calls share one attempt. A `default` permission is first resolved
    /// through the gesture coordinator; a `denied` permission fails immediately without
    /// any network traffic.
    pub async fn subscribe(&self) -> PushResult<PushStatus> {
        let attempt = {
            let mut state = self.inner.state.lock().unwrap();
            match &state.subscribe_in_flight {
                Some((_, attempt)) => attempt.clone(),
                None => {
                    let id = state.next_subscribe_id;
                    state.next_subscribe_id += 1;
                    let attempt = run_subscribe(Arc::clone(&self.inner), id).boxed().shared();
                    state.subscribe_in_flight = Some((id, attempt.clone()));
                    attempt
                }
            }
        };
        attempt.await
    }

    /// Removes the local subscription, then asks the backend to drop its record.
    ///
    /// The local removal is kept when the backend call fails; the failure is returned
    /// as a `BackendRejection` and published.
    pub async fn unsubscribe(&self) -> PushResult<PushStatus> {
        let inner = &self.inner;
        if !inner.platform.is_supported() {
            return Err(inner.fail(unsupported("Push messaging is not supported"), |_| {}));
        }

        let subscription = match inner.platform.get_subscription().await {
            Ok(Some(subscription)) => subscription,
            Ok(None) => {
                LOGGER.info("No active push subscription to remove");
                return Ok(self.reconcile().await);
            }
            Err(err) => return Err(inner.fail(err, |_| {})),
        };

        if let Err(err) = inner.platform.unsubscribe().await {
            return Err(inner.fail(err, |_| {}));
        }

        match inner.backend.unregister(&subscription.endpoint).await {
            Ok(()) => {
                LOGGER.info("Push subscription removed");
                Ok(self.reconcile().await)
            }
            Err(err) => {
                LOGGER.warn(format!(
                    "Local subscription removed but the backend kept its record: {err}"
                ));
                let rejection = backend_rejection(format!(
                    "Backend did not drop the subscription: {}",
                    err.message()
                ));
                Err(inner.fail(rejection, |status| {
                    status.subscribed = false;
                    status.backend_registered = false;
                    status.endpoint = None;
                }))
            }
        }
    }

    /// Asks the backend to push a test notification to this user's devices.
    ///
    /// Requires the last reconciled state to be `SubscribedConfirmed`.
    pub async fn send_test(&self, notification: &TestNotification) -> PushResult<SendTestReport> {
        let confirmed = self
            .last_status()
            .is_some_and(|status| status.state == PushState::SubscribedConfirmed);
        if !confirmed {
            return Err(self.inner.fail(
                precondition_failed("A confirmed subscription is required to send a test notification"),
                |_| {},
            ));
        }

        match self.inner.backend.send_test(notification).await {
            Ok(report) => {
                for error in &report.errors {
                    LOGGER.warn(format!("Test notification delivery error: {error}"));
                }
                Ok(report)
            }
            Err(err) => Err(self.inner.fail(err, |_| {})),
        }
    }
}

async fn run_subscribe(inner: Arc<ManagerInner>, id: u64) -> PushResult<PushStatus> {
    let result = inner.subscribe_once().await;
    inner.finish_subscribe(id);
    result.map_err(|err| inner.fail(err, |_| {}))
}

impl ManagerInner {
    async fn subscribe_once(&self) -> PushResult<PushStatus> {
        if !self.platform.is_supported() {
            return Err(unsupported("Push messaging is not supported"));
        }
        self.ensure_permission().await?;

        let subscription = match self.platform.get_subscription().await? {
            Some(existing) => {
                log::debug!("reusing push subscription {}", existing.endpoint);
                existing
            }
            None => {
                let key = self.vapid.get(self.backend.as_ref(), false).await?;
                self.platform.subscribe(key.as_bytes()).await?
            }
        };

        if self.backend_knows(&subscription.endpoint).await {
            log::debug!("subscription already confirmed by backend");
        } else {
            let request = RegistrationRequest::new(&subscription, self.browser());
            self.backend.register(&request).await?;
            LOGGER.info("Push subscription registered with backend");
        }

        let status = self.compute_status().await;
        self.publish(status.clone());
        if status.state == PushState::SubscribedConfirmed {
            return Ok(status);
        }
        Err(match status.last_error {
            Some(last_error) => network_failure(format!(
                "Could not confirm the registration: {last_error}"
            )),
            None => backend_rejection(format!(
                "Backend did not confirm the subscription (state {})",
                status.state.as_str()
            )),
        })
    }

    /// Fresh backend lookup; a failed lookup counts as unknown so registration is retried.
    async fn backend_knows(&self, endpoint: &str) -> bool {
        match self.backend.status(Some(endpoint)).await {
            Ok(remote) => remote.subscribed,
            Err(err) => {
                log::debug!("backend status unavailable before registration: {err}");
                false
            }
        }
    }

    async fn ensure_permission(&self) -> PushResult<()> {
        match self.coordinator.permission() {
            PermissionState::Granted => Ok(()),
            PermissionState::Denied => Err(permission_denied(
                "Notifications are blocked; the browser will not prompt again",
            )),
            PermissionState::Default => {
                let decided = self.coordinator.request_permission().await;
                if decided != PermissionState::Granted {
                    return Err(permission_denied(format!(
                        "Notification permission was not granted ({})",
                        decided.as_str()
                    )));
                }
                self.clock.sleep(PERMISSION_SETTLE_DELAY).await;
                if self.coordinator.permission() == PermissionState::Denied {
                    return Err(permission_denied("Notification permission was revoked"));
                }
                Ok(())
            }
        }
    }

    async fn compute_status(&self) -> PushStatus {
        let permission = self.coordinator.permission();
        if !self.platform.is_supported() {
            return PushStatus::unsupported(permission);
        }

        let mut status = PushStatus::unsubscribed(permission);
        let mut errors: Vec<PushError> = Vec::new();

        let local: Option<PushSubscriptionDetails> = match self.platform.get_subscription().await {
            Ok(local) => local,
            Err(err) => {
                errors.push(err);
                None
            }
        };
        let endpoint = local.as_ref().map(|subscription| subscription.endpoint.clone());

        match self.backend.status(endpoint.as_deref()).await {
            Ok(remote) => {
                status.backend_registered = remote.subscribed;
                status.device_count = remote.devices;
            }
            Err(err) => errors.push(err),
        }

        status.subscribed = local.is_some();
        status.endpoint = endpoint;
        status.last_error = errors.first().map(ToString::to_string);
        status.rederive();
        status
    }

    fn browser(&self) -> Option<String> {
        let user_agent = self.coordinator.environment().user_agent;
        (!user_agent.is_empty()).then(|| browser_name(&user_agent).to_string())
    }

    fn publish(&self, status: PushStatus) {
        self.state.lock().unwrap().last_status = Some(status.clone());
        self.status_bus.publish(status);
    }

    /// Records `err` on top of the last known status without touching the network.
    fn fail(&self, err: PushError, adjust: impl FnOnce(&mut PushStatus)) -> PushError {
        let permission = self.coordinator.permission();
        let mut status = self
            .state
            .lock()
            .unwrap()
            .last_status
            .clone()
            .unwrap_or_else(|| PushStatus::unsubscribed(permission));
        status.supported = self.platform.is_supported();
        status.permission = permission;
        adjust(&mut status);
        status.last_error = Some(err.to_string());
        status.rederive();
        LOGGER.error(format!("Push operation failed: {err}"));
        self.publish(status);
        err
    }

    fn finish_subscribe(&self, id: u64) {
        let mut state = self.state.lock().unwrap();
        if matches!(&state.subscribe_in_flight, Some((current, _)) if *current == id) {
            state.subscribe_in_flight = None;
        }
    }
}
