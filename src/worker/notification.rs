use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::worker::error::WorkerResult;
use crate::worker::logger::LOGGER;

/// Fallback presentation for push payloads that omit fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "Notification".to_string(),
            body: "New notification".to_string(),
            icon: "/static/icons/icon-192x192.png".to_string(),
            badge: "/static/icons/icon-72x72.png".to_string(),
            vibrate: vec![200, 100, 200],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Deep-link data attached to a notification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Notification the worker asks the host to display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub image: Option<String>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
    pub vibrate: Vec<u32>,
}

#[derive(Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
    badge: Option<String>,
    image: Option<String>,
    data: Option<NotificationData>,
    actions: Option<Vec<NotificationAction>>,
    vibrate: Option<Vec<u32>>,
}

impl NotificationRequest {
    /// Builds the notification for a push payload.
    ///
    /// Missing or empty fields fall back to `defaults`; an absent or malformed payload
    /// yields the default notification.
    pub fn from_payload(payload: Option<&[u8]>, defaults: &NotificationDefaults) -> Self {
        let parsed = match payload {
            Some(bytes) if !bytes.is_empty() => {
                serde_json::from_slice::<PushPayload>(bytes).unwrap_or_else(|err| {
                    LOGGER.warn(format!("Ignoring malformed push payload: {err}"));
                    PushPayload::default()
                })
            }
            _ => PushPayload::default(),
        };

        let or_default = |value: Option<String>, fallback: &str| {
            value
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            title: or_default(parsed.title, &defaults.title),
            body: or_default(parsed.body, &defaults.body),
            icon: or_default(parsed.icon, &defaults.icon),
            badge: or_default(parsed.badge, &defaults.badge),
            image: parsed.image.filter(|image| !image.is_empty()),
            data: parsed.data.unwrap_or_default(),
            actions: parsed.actions.unwrap_or_default(),
            vibrate: parsed
                .vibrate
                .filter(|pattern| !pattern.is_empty())
                .unwrap_or_else(|| defaults.vibrate.clone()),
        }
    }
}

/// Host binding that displays notifications from the worker.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, request: &NotificationRequest) -> WorkerResult<()>;
}
