use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::permission::environment::{requires_gesture, EnvironmentProbe, EnvironmentSignals};
use crate::permission::logger::LOGGER;
use crate::permission::types::{NotificationPlatform, PermissionState};

type PromptFuture = Shared<BoxFuture<'static, PermissionState>>;

/// Serializes notification permission prompts.
///
/// At most one native prompt is in flight; every caller that asks while one is pending
/// awaits the same outcome. When the host requires a user gesture the prompt is held
/// back until [`PermissionGestureCoordinator::notify_user_gesture`] is called from a
/// gesture handler.
#[derive(Clone)]
pub struct PermissionGestureCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    probe: Arc<dyn EnvironmentProbe>,
    notifications: Arc<dyn NotificationPlatform>,
    state: Mutex<CoordinatorState>,
}

#[derive(Default)]
struct CoordinatorState {
    verdict: Option<bool>,
    in_flight: Option<(u64, PromptFuture)>,
    next_prompt_id: u64,
    gesture_waiters: Vec<oneshot::Sender<()>>,
}

impl PermissionGestureCoordinator {
    pub fn new(
        probe: Arc<dyn EnvironmentProbe>,
        notifications: Arc<dyn NotificationPlatform>,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                probe,
                notifications,
                state: Mutex::new(CoordinatorState::default()),
            }),
        }
    }

    pub fn permission(&self) -> PermissionState {
        self.inner.notifications.permission()
    }

    /// Current environment observations, read fresh from the probe.
    pub fn environment(&self) -> EnvironmentSignals {
        self.inner.probe.signals()
    }

    /// Returns the cached gesture verdict, computing it on first use.
    pub async fn requires_gesture(&self) -> bool {
        self.inner.requires_gesture().await
    }

    pub fn cached_verdict(&self) -> Option<bool> {
        self.inner.state.lock().unwrap().verdict
    }

    /// Drops the cached verdict so the next check re-probes the environment.
    pub fn invalidate(&self) {
        self.inner.state.lock().unwrap().verdict = None;
    }

    /// Whether a prompt is waiting for a user gesture.
    pub fn awaiting_gesture(&self) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        state.gesture_waiters.retain(|waiter| !waiter.is_canceled());
        !state.gesture_waiters.is_empty()
    }

    /// Releases prompts held for a gesture. Returns `true` if any were waiting.
    pub fn notify_user_gesture(&self) -> bool {
        let waiters = std::mem::take(&mut self.inner.state.lock().unwrap().gesture_waiters);
        let mut released = false;
        for waiter in waiters {
            released |= waiter.send(()).is_ok();
        }
        if released {
            LOGGER.debug("User gesture received; showing permission prompt");
        }
        released
    }

    /// Resolves the notification permission, prompting at most once at a time.
    ///
    /// A decided permission (`granted` or `denied`) is returned without prompting.
    /// Prompt failures resolve to [`PermissionState::Denied`].
    pub async fn request_permission(&self) -> PermissionState {
        let current = self.inner.notifications.permission();
        if current != PermissionState::Default {
            return current;
        }

        let prompt = {
            let mut state = self.inner.state.lock().unwrap();
            match &state.in_flight {
                Some((_, prompt)) => prompt.clone(),
                None => {
                    let id = state.next_prompt_id;
                    state.next_prompt_id += 1;
                    let prompt = run_prompt(Arc::clone(&self.inner), id).boxed().shared();
                    state.in_flight = Some((id, prompt.clone()));
                    prompt
                }
            }
        };
        prompt.await
    }
}

impl CoordinatorInner {
    async fn requires_gesture(&self) -> bool {
        if let Some(verdict) = self.state.lock().unwrap().verdict {
            return verdict;
        }
        let signals = self.probe.signals();
        let related = self.probe.installed_related_apps().await;
        let verdict = requires_gesture(&signals, related);
        self.state.lock().unwrap().verdict = Some(verdict);
        log::debug!("gesture verdict computed: {verdict}");
        verdict
    }

    fn gesture(&self) -> oneshot::Receiver<()> {
        let (sender, receiver) = oneshot::channel();
        self.state.lock().unwrap().gesture_waiters.push(sender);
        receiver
    }

    fn finish(&self, id: u64) {
        let mut state = self.state.lock().unwrap();
        if matches!(&state.in_flight, Some((current, _)) if *current == id) {
            state.in_flight = None;
        }
    }
}

async fn run_prompt(inner: Arc<CoordinatorInner>, id: u64) -> PermissionState {
    if inner.requires_gesture().await {
        LOGGER.info("Permission prompt deferred until the next user gesture");
        if inner.gesture().await.is_err() {
            inner.finish(id);
            return PermissionState::Default;
        }
    }

    let outcome = match inner.notifications.request_permission().await {
        Ok(state) => state,
        Err(err) => {
            LOGGER.warn(format!("Permission prompt failed: {err}"));
            PermissionState::Denied
        }
    };
    inner.finish(id);
    LOGGER.info(format!("Notification permission resolved: {}", outcome.as_str()));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::environment::DisplayMode;
    use crate::test_support::{FakeEnvironment, FakeNotifications};

    const ANDROID: &str = "Mozilla/5.0 (Linux; Android 14) Chrome/126.0 Mobile";

    fn installed_android() -> EnvironmentSignals {
        EnvironmentSignals {
            display_mode: DisplayMode::Standalone,
            has_browser_chrome_marker: true,
            user_agent: ANDROID.into(),
            ..Default::default()
        }
    }

    fn browser_tab() -> EnvironmentSignals {
        EnvironmentSignals {
            has_browser_chrome_marker: true,
            user_agent: ANDROID.into(),
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_callers_share_one_gesture_gated_prompt() {
        let notifications = Arc::new(FakeNotifications::new(PermissionState::Default));
        notifications.answer_with(PermissionState::Granted);
        let coordinator = PermissionGestureCoordinator::new(
            Arc::new(FakeEnvironment::new(installed_android())),
            notifications.clone(),
        );
        let other = coordinator.clone();

        let gesture = async {
            tokio::task::yield_now().await;
            assert!(coordinator.awaiting_gesture());
            assert_eq!(notifications.prompt_count(), 0);
            assert!(coordinator.notify_user_gesture());
        };
        let (first, second, ()) = tokio::join!(
            coordinator.request_permission(),
            other.request_permission(),
            gesture
        );

        assert_eq!(first, PermissionState::Granted);
        assert_eq!(second, PermissionState::Granted);
        assert_eq!(notifications.prompt_count(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn decided_permission_is_never_prompted() {
        let notifications = Arc::new(FakeNotifications::new(PermissionState::Denied));
        let coordinator = PermissionGestureCoordinator::new(
            Arc::new(FakeEnvironment::new(browser_tab())),
            notifications.clone(),
        );
        assert_eq!(coordinator.request_permission().await, PermissionState::Denied);
        assert_eq!(notifications.prompt_count(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn prompt_failure_resolves_to_denied() {
        let notifications = Arc::new(FakeNotifications::new(PermissionState::Default));
        notifications.fail_prompt();
        let coordinator = PermissionGestureCoordinator::new(
            Arc::new(FakeEnvironment::new(browser_tab())),
            notifications.clone(),
        );
        assert_eq!(coordinator.request_permission().await, PermissionState::Denied);
        assert_eq!(notifications.prompt_count(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dismissed_prompt_allows_a_new_one() {
        let notifications = Arc::new(FakeNotifications::new(PermissionState::Default));
        notifications.answer_with(PermissionState::Default);
        let coordinator = PermissionGestureCoordinator::new(
            Arc::new(FakeEnvironment::new(browser_tab())),
            notifications.clone(),
        );
        assert_eq!(coordinator.request_permission().await, PermissionState::Default);
        assert_eq!(coordinator.request_permission().await, PermissionState::Default);
        assert_eq!(notifications.prompt_count(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn verdict_is_cached_until_invalidated() {
        let environment = Arc::new(FakeEnvironment::new(browser_tab()));
        let coordinator = PermissionGestureCoordinator::new(
            environment.clone(),
            Arc::new(FakeNotifications::new(PermissionState::Default)),
        );

        assert!(!coordinator.requires_gesture().await);
        environment.set_signals(installed_android());
        assert!(!coordinator.requires_gesture().await);
        assert_eq!(environment.probe_count(), 1);

        coordinator.invalidate();
        assert_eq!(coordinator.cached_verdict(), None);
        assert!(coordinator.requires_gesture().await);
        assert_eq!(environment.probe_count(), 2);
    }
}
