//! Injectable time source for the named delays of the crate (banner auto-dismiss,
//! permission settle delay).
//!
//! Production code uses [`SystemClock`]. Tests drive time explicitly with
//! [`ManualClock`], whose timers only fire when [`ManualClock::advance`] moves the clock
//! past their deadline.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::platform::runtime;

pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;

    /// Returns a future that resolves once `duration` has elapsed.
    ///
    /// The timer is armed when this method is called, not when the future is first
    /// polled.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

pub type SharedClock = Arc<dyn Clock>;

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        if duration.is_zero() {
            return futures::future::ready(()).boxed();
        }
        // `tokio::time::sleep` registers its deadline on creation but needs a runtime.
        match tokio::runtime::Handle::try_current() {
            Ok(_) => tokio::time::sleep(duration).boxed(),
            Err(_) => {
                let deadline = Instant::now() + duration;
                async move {
                    runtime::sleep(deadline.saturating_duration_since(Instant::now())).await;
                }
                .boxed()
            }
        }
    }
}

/// Clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    sleepers: Vec<(Duration, oneshot::Sender<()>)>,
    requested: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward and wakes every timer whose deadline has been reached.
    pub fn advance(&self, duration: Duration) {
        let due = {
            let mut state = self.state.lock().unwrap();
            state.now += duration;
            let now = state.now;
            let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut state.sleepers)
                .into_iter()
                .partition(|(deadline, _)| *deadline <= now);
            state.sleepers = pending;
            due
        };
        for (_, sender) in due {
            let _ = sender.send(());
        }
    }

    /// Number of timers that are armed and not yet due.
    pub fn pending_timers(&self) -> usize {
        self.state.lock().unwrap().sleepers.len()
    }

    /// Every duration ever passed to [`Clock::sleep`], in call order.
    pub fn requested_sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().requested.clone()
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.state.lock().unwrap().now
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        let mut state = self.state.lock().unwrap();
        state.requested.push(duration);
        if duration.is_zero() {
            return futures::future::ready(()).boxed();
        }
        let (sender, receiver) = oneshot::channel();
        let deadline = state.now + duration;
        state.sleepers.push((deadline, sender));
        async move {
            let _ = receiver.await;
        }
        .boxed()
    }
}
