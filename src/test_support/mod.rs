//! Doubles for the host bindings, shared by the unit tests of every component.

pub mod fakes;
pub mod http;

use std::time::Duration;

use crate::platform::clock::ManualClock;

pub use fakes::{
    sample_vapid_key, FakeBackend, FakeEnvironment, FakeLocation, FakeNetwork,
    FakeNotificationSink, FakeNotifications, FakePushPlatform,
};
pub use http::start_mock_server;

/// Lets detached tasks spawned on the current-thread runtime run to completion.
pub async fn drain_tasks() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Waits until a timer is armed on `clock`, then moves time forward by `duration`.
pub async fn advance_when_armed(clock: &ManualClock, duration: Duration) {
    for _ in 0..1_000 {
        if clock.pending_timers() > 0 {
            clock.advance(duration);
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("no timer was armed");
}
