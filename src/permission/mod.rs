//! Notification permission prompting that respects user-gesture requirements of
//! installed apps.
mod coordinator;
mod environment;
pub mod error;
mod logger;
mod types;

pub use coordinator::PermissionGestureCoordinator;
pub use environment::{
    browser_name, detect_context, requires_gesture, DisplayMode, EnvironmentProbe,
    EnvironmentSignals, ExecutionContext, Platform,
};
pub use types::{NotificationPlatform, PermissionState};
