use std::time::Duration;

pub const PUSH_COMPONENT_NAME: &str = "push";

/// Wait after a granted prompt before the first subscribe attempt; some platforms
/// report the new permission to the push manager with a lag.
pub const PERMISSION_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Key under which the VAPID public key is persisted.
pub const VAPID_KEY_STORAGE_KEY: &str = "pwa-push/vapid-public-key";

/// Uncompressed P-256 public keys are 65 bytes starting with `0x04`.
pub const VAPID_KEY_LENGTH: usize = 65;

pub const CSRF_HEADER: &str = "X-CSRFToken";

pub const DEFAULT_VAPID_KEY_PATH: &str = "/api/push/vapid-key/";
pub const DEFAULT_SUBSCRIBE_PATH: &str = "/api/push/subscribe/";
pub const DEFAULT_UNSUBSCRIBE_PATH: &str = "/api/push/unsubscribe/";
pub const DEFAULT_TEST_PATH: &str = "/api/push/test/";
pub const DEFAULT_STATUS_PATH: &str = "/api/push/status/";
