use std::sync::Arc;

use url::Url;

use crate::bus::{PageMessage, WorkerEnvelope, WorkerMessage};
use crate::cache::{
    ActivateReport, CacheController, CacheRequest, CacheResult, FetchOutcome, FetchSource,
    InstallReport,
};
use crate::worker::clients::{WindowClient, WindowClients};
use crate::worker::error::{invalid_url, WorkerResult};
use crate::worker::logger::LOGGER;
use crate::worker::notification::{
    NotificationData, NotificationDefaults, NotificationRequest, NotificationSink,
};

/// Tag of the one-off background sync registered by pages.
pub const SYNC_TAG: &str = "sync-data";
/// Tag of the periodic content refresh.
pub const PERIODIC_SYNC_TAG: &str = "content-sync";

/// Event handlers of the background worker.
///
/// Each handler corresponds to one worker event. Handlers never panic; failures are
/// logged and, where a page should know, broadcast as envelopes to every window client.
#[derive(Clone)]
pub struct BackgroundWorker {
    inner: Arc<WorkerInner>,
}

struct WorkerInner {
    cache: CacheController,
    clients: Arc<dyn WindowClients>,
    notifications: Arc<dyn NotificationSink>,
    defaults: NotificationDefaults,
}

impl BackgroundWorker {
    pub fn new(
        cache: CacheController,
        clients: Arc<dyn WindowClients>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_defaults(cache, clients, notifications, NotificationDefaults::default())
    }

    pub fn with_defaults(
        cache: CacheController,
        clients: Arc<dyn WindowClients>,
        notifications: Arc<dyn NotificationSink>,
        defaults: NotificationDefaults,
    ) -> Self {
        Self {
            inner: Arc::new(WorkerInner {
                cache,
                clients,
                notifications,
                defaults,
            }),
        }
    }

    pub fn cache(&self) -> &CacheController {
        &self.inner.cache
    }

    pub async fn on_install<S: AsRef<str>>(&self, manifest: &[S]) -> CacheResult<InstallReport> {
        self.inner.cache.install(manifest).await
    }

    /// Purges stale caches, then claims every open page.
    pub async fn on_activate(&self) -> ActivateReport {
        let report = self.inner.cache.activate().await;
        match self.inner.clients.claim().await {
            Ok(claimed) => LOGGER.info(format!(
                "Activated {}; claimed {claimed} page(s)",
                self.inner.cache.version()
            )),
            Err(err) => LOGGER.warn(format!("Failed to claim clients: {err}")),
        }
        report
    }

    /// Serves a request and tells pages about cache use, server errors and lost
    /// connectivity.
    pub async fn on_fetch(&self, request: CacheRequest) -> CacheResult<FetchOutcome> {
        let url = request.url.clone();
        match self.inner.cache.handle_fetch(request).await {
            Ok(outcome) => {
                match outcome.source {
                    FetchSource::Cache => {
                        self.broadcast(WorkerMessage::ServingCached).await;
                    }
                    FetchSource::Network if outcome.response.status >= 500 => {
                        let status = outcome.response.status;
                        self.broadcast(WorkerMessage::ServerError {
                            message: Some(format!("{url} answered with status {status}")),
                            status: Some(status),
                        })
                        .await;
                    }
                    FetchSource::Network => {}
                }
                Ok(outcome)
            }
            Err(err) => {
                self.broadcast(WorkerMessage::Offline {
                    message: Some(format!("Could not reach {url}")),
                })
                .await;
                Err(err)
            }
        }
    }

    /// Answers a page message. `PING` gets a `PONG` addressed to the sender only.
    pub async fn on_message(&self, client_id: &str, message: PageMessage) {
        match message {
            PageMessage::Ping => {
                let pong = WorkerEnvelope::new(WorkerMessage::Pong);
                if let Err(err) = self.inner.clients.post_message(client_id, &pong).await {
                    LOGGER.warn(format!("Failed to answer PING: {err}"));
                }
            }
        }
    }

    /// Displays the notification carried by a push event.
    pub async fn on_push(&self, payload: Option<&[u8]>) -> WorkerResult<NotificationRequest> {
        let request = NotificationRequest::from_payload(payload, &self.inner.defaults);
        self.inner.notifications.show(&request).await?;
        log::debug!("notification shown: {}", request.title);
        Ok(request)
    }

    /// Brings the user to the notification's deep link (`/` when absent).
    ///
    /// An open window is focused and told to navigate; otherwise a new window is
    /// opened at the target.
    pub async fn on_notification_click(&self, data: &NotificationData) -> WorkerResult<WindowClient> {
        let target = data
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or("/");
        let absolute = self.resolve(target)?;

        let windows = self.inner.clients.match_all().await;
        let existing = windows
            .iter()
            .find(|client| client.url == absolute)
            .or_else(|| windows.iter().find(|client| client.focused))
            .or_else(|| windows.first());

        match existing {
            Some(client) => {
                let focused = self.inner.clients.focus(&client.id).await?;
                if focused.url != absolute {
                    let navigate = WorkerEnvelope::new(WorkerMessage::Navigate {
                        url: target.to_string(),
                    });
                    self.inner.clients.post_message(&focused.id, &navigate).await?;
                }
                Ok(focused)
            }
            None => self.inner.clients.open_window(&absolute).await,
        }
    }

    /// Handles a background sync event. Returns whether the tag is known.
    pub async fn on_sync(&self, tag: &str) -> bool {
        if tag != SYNC_TAG {
            log::debug!("ignoring sync tag {tag}");
            return false;
        }
        self.broadcast(WorkerMessage::SyncComplete).await;
        true
    }

    pub async fn on_periodic_sync(&self, tag: &str) -> bool {
        if tag != PERIODIC_SYNC_TAG {
            log::debug!("ignoring periodic sync tag {tag}");
            return false;
        }
        self.broadcast(WorkerMessage::PeriodicSyncComplete).await;
        true
    }

    /// Posts `message` to every window client. Returns how many received it.
    pub async fn broadcast(&self, message: WorkerMessage) -> usize {
        let envelope = WorkerEnvelope::new(message);
        let mut delivered = 0;
        for client in self.inner.clients.match_all().await {
            match self.inner.clients.post_message(&client.id, &envelope).await {
                Ok(()) => delivered += 1,
                Err(err) => LOGGER.warn(format!(
                    "Failed to post {} to {}: {err}",
                    envelope.message.kind(),
                    client.id
                )),
            }
        }
        delivered
    }

    fn resolve(&self, target: &str) -> WorkerResult<Url> {
        self.inner
            .cache
            .scope()
            .join(target)
            .map_err(|err| invalid_url(format!("Invalid notification URL '{target}': {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusSubscription;
    use crate::cache::{CacheVersion, InMemoryCacheStorage};
    use crate::test_support::{FakeNetwork, FakeNotificationSink};
    use crate::worker::clients::InMemoryClients;

    struct Harness {
        worker: BackgroundWorker,
        network: Arc<FakeNetwork>,
        clients: Arc<InMemoryClients>,
        sink: Arc<FakeNotificationSink>,
    }

    fn harness() -> Harness {
        let network = Arc::new(FakeNetwork::new());
        let clients = Arc::new(InMemoryClients::new());
        let sink = Arc::new(FakeNotificationSink::new());
        let cache = CacheController::new(
            CacheVersion::new("v1"),
            Url::parse("https://app.test/").unwrap(),
            Arc::new(InMemoryCacheStorage::new()),
            network.clone(),
        );
        Harness {
            worker: BackgroundWorker::new(cache, clients.clone(), sink.clone()),
            network,
            clients,
            sink,
        }
    }

    fn page(h: &Harness, path: &str) -> (WindowClient, BusSubscription<WorkerEnvelope>) {
        h.clients
            .connect(Url::parse("https://app.test/").unwrap().join(path).unwrap())
    }

    fn kinds(inbox: &BusSubscription<WorkerEnvelope>) -> Vec<&'static str> {
        inbox
            .drain()
            .into_iter()
            .map(|envelope| envelope.message.kind())
            .collect()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fetch_outcomes_are_broadcast() {
        let h = harness();
        let (_, first) = page(&h, "/");
        let (_, second) = page(&h, "/inbox");
        h.network.respond("https://app.test/api", 503, "down");
        h.network.fail("https://app.test/feed");

        let outcome = h
            .worker
            .on_fetch(CacheRequest::get(Url::parse("https://app.test/api").unwrap()))
            .await
            .unwrap();
        assert_eq!(outcome.response.status, 503);
        assert!(h
            .worker
            .on_fetch(CacheRequest::get(Url::parse("https://app.test/feed").unwrap()))
            .await
            .is_err());

        let received = second.drain();
        assert_eq!(kinds(&first), ["SERVER_ERROR", "OFFLINE"]);
        assert_eq!(
            received[0].message,
            WorkerMessage::ServerError {
                message: Some("https://app.test/api answered with status 503".into()),
                status: Some(503)
            }
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn cache_hits_are_announced() {
        let h = harness();
        let (_, inbox) = page(&h, "/");
        h.network.respond("https://app.test/", 200, "<html>");
        h.worker.on_install(&["/"]).await.unwrap();

        let outcome = h
            .worker
            .on_fetch(CacheRequest::get(Url::parse("https://app.test/").unwrap()))
            .await
            .unwrap();

        assert_eq!(outcome.source, FetchSource::Cache);
        assert_eq!(kinds(&inbox), ["SERVING_CACHED"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ping_is_answered_to_sender_only() {
        let h = harness();
        let (sender, sender_inbox) = page(&h, "/");
        let (_, other_inbox) = page(&h, "/inbox");

        h.worker.on_message(&sender.id, PageMessage::Ping).await;

        assert_eq!(kinds(&sender_inbox), ["PONG"]);
        assert!(other_inbox.try_recv().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn activate_claims_open_pages() {
        let h = harness();
        let (client, _inbox) = page(&h, "/");

        h.worker.on_activate().await;

        assert!(h.clients.get(&client.id).unwrap().controlled);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn push_shows_notification_with_defaults() {
        let h = harness();
        let shown = h
            .worker
            .on_push(Some(&br#"{"title":"Hello","data":{"url":"/inbox"}}"#[..]))
            .await
            .unwrap();

        assert_eq!(shown.body, "New notification");
        assert_eq!(h.sink.shown(), vec![shown]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn click_focuses_open_window_and_navigates() {
        let h = harness();
        let (client, inbox) = page(&h, "/");
        let data = NotificationData {
            url: Some("/inbox/42".into()),
            ..Default::default()
        };

        let focused = h.worker.on_notification_click(&data).await.unwrap();

        assert_eq!(focused.id, client.id);
        assert!(focused.focused);
        assert_eq!(
            inbox.drain()[0].message,
            WorkerMessage::Navigate {
                url: "/inbox/42".into()
            }
        );
        assert!(h.clients.opened_windows().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn click_without_windows_opens_root() {
        let h = harness();

        let opened = h
            .worker
            .on_notification_click(&NotificationData::default())
            .await
            .unwrap();

        assert_eq!(opened.url.as_str(), "https://app.test/");
        assert_eq!(h.clients.opened_windows().len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sync_tags_are_filtered() {
        let h = harness();
        let (_, inbox) = page(&h, "/");

        assert!(h.worker.on_sync(SYNC_TAG).await);
        assert!(!h.worker.on_sync("unknown").await);
        assert!(h.worker.on_periodic_sync(PERIODIC_SYNC_TAG).await);
        assert!(!h.worker.on_periodic_sync(SYNC_TAG).await);

        assert_eq!(kinds(&inbox), ["SYNC_COMPLETE", "PERIODIC_SYNC_COMPLETE"]);
    }
}
