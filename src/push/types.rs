use serde::{Deserialize, Serialize};

use crate::permission::PermissionState;

/// Reconciled position of this browser in the subscription lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushState {
    Unsupported,
    Denied,
    DefaultUnsubscribed,
    SubscribedPendingBackend,
    SubscribedConfirmed,
}

impl PushState {
    pub fn derive(
        supported: bool,
        permission: PermissionState,
        locally_subscribed: bool,
        backend_registered: bool,
    ) -> Self {
        if !supported {
            PushState::Unsupported
        } else if permission == PermissionState::Denied {
            PushState::Denied
        } else if !locally_subscribed {
            PushState::DefaultUnsubscribed
        } else if backend_registered {
            PushState::SubscribedConfirmed
        } else {
            PushState::SubscribedPendingBackend
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PushState::Unsupported => "unsupported",
            PushState::Denied => "denied",
            PushState::DefaultUnsubscribed => "default_unsubscribed",
            PushState::SubscribedPendingBackend => "subscribed_pending_backend",
            PushState::SubscribedConfirmed => "subscribed_confirmed",
        }
    }
}

/// Snapshot published to pages after every reconciliation or failed operation.
///
/// `subscribed` only reflects the local browser subscription; `backend_registered` is
/// what the backend reported for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushStatus {
    pub supported: bool,
    pub permission: PermissionState,
    pub subscribed: bool,
    pub backend_registered: bool,
    pub device_count: u32,
    pub state: PushState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PushStatus {
    pub fn unsupported(permission: PermissionState) -> Self {
        Self {
            supported: false,
            permission,
            subscribed: false,
            backend_registered: false,
            device_count: 0,
            state: PushState::Unsupported,
            endpoint: None,
            last_error: None,
        }
    }

    pub fn unsubscribed(permission: PermissionState) -> Self {
        Self {
            supported: true,
            permission,
            subscribed: false,
            backend_registered: false,
            device_count: 0,
            state: PushState::derive(true, permission, false, false),
            endpoint: None,
            last_error: None,
        }
    }

    pub(crate) fn rederive(&mut self) {
        self.state = PushState::derive(
            self.supported,
            self.permission,
            self.subscribed,
            self.backend_registered,
        );
    }
}

/// Endpoint and keys of a browser push subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriptionDetails {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistrationRequest {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

impl RegistrationRequest {
    pub fn new(subscription: &PushSubscriptionDetails, browser: Option<String>) -> Self {
        Self {
            endpoint: subscription.endpoint.clone(),
            p256dh: subscription.p256dh.clone(),
            auth: subscription.auth.clone(),
            browser,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BackendStatus {
    #[serde(default)]
    pub subscribed: bool,
    #[serde(default)]
    pub devices: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestNotification {
    pub title: String,
    pub body: String,
    pub url: String,
}

impl Default for TestNotification {
    fn default() -> Self {
        Self {
            title: "Test notification".to_string(),
            body: "Push notifications are working".to_string(),
            url: "/".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SendTestReport {
    #[serde(default)]
    pub sent: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}
