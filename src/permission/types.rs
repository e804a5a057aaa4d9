use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::permission::error::PermissionResult;

/// Notification permission states as exposed by the Web Notifications API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// The user has not decided whether to allow notifications.
    #[default]
    Default,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Default => "default",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        }
    }
}

/// Host binding for the notification permission.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    fn permission(&self) -> PermissionState;

    /// Shows the native permission prompt and resolves with the user's decision.
    async fn request_permission(&self) -> PermissionResult<PermissionState>;
}
