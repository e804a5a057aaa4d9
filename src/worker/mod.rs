//! Worker-side event handling: install, activate, fetch, push, notification click and
//! background sync.
mod clients;
pub mod error;
mod logger;
mod notification;
mod service;

pub use clients::{InMemoryClients, WindowClient, WindowClients};
pub use notification::{
    NotificationAction, NotificationData, NotificationDefaults, NotificationRequest,
    NotificationSink,
};
pub use service::{BackgroundWorker, PERIODIC_SYNC_TAG, SYNC_TAG};
