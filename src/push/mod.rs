//! Push subscription lifecycle: permission, local subscription and backend record.
mod backend;
mod constants;
pub mod error;
mod logger;
mod manager;
mod platform;
mod types;
mod vapid;

pub use backend::{HttpPushBackend, PushBackend, PushEndpoints};
pub use constants::{PERMISSION_SETTLE_DELAY, PUSH_COMPONENT_NAME, VAPID_KEY_STORAGE_KEY};
pub use error::{PushError, PushErrorCode, PushResult};
pub use manager::{PushDependencies, PushSubscriptionManager};
pub use platform::PushPlatform;
pub use types::{
    BackendStatus, PushState, PushStatus, PushSubscriptionDetails, RegistrationRequest,
    SendTestReport, TestNotification,
};
pub use vapid::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, VapidKey, VapidKeyCache};
