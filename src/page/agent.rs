use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use url::Url;

use crate::bus::{BusResult, BusSubscription, MessageBus, PageMessage, WorkerEnvelope, WorkerMessage};
use crate::page::banner::{Banner, BannerKind, BannerManager};
use crate::page::logger::LOGGER;

/// Host binding for the page's current location.
pub trait PageLocation: Send + Sync {
    /// Absolute URL of the current document, e.g. `https://app.example/inbox`.
    fn href(&self) -> String;

    fn navigate(&self, url: &str);
}

/// Observable page-level consequence of a worker envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageEvent {
    Offline { message: Option<String> },
    ServerError { message: Option<String>, status: Option<u16> },
    Navigated { url: String },
}

/// Page-side consumer of worker envelopes.
#[derive(Clone)]
pub struct PageAgent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    banners: BannerManager,
    location: Arc<dyn PageLocation>,
    events: MessageBus<PageEvent>,
    outbox: MessageBus<PageMessage>,
    worker_responsive: AtomicBool,
}

impl PageAgent {
    pub fn new(banners: BannerManager, location: Arc<dyn PageLocation>) -> Self {
        Self {
            inner: Arc::new(AgentInner {
                banners,
                location,
                events: MessageBus::new(),
                outbox: MessageBus::new(),
                worker_responsive: AtomicBool::new(false),
            }),
        }
    }

    pub fn banners(&self) -> &BannerManager {
        &self.inner.banners
    }

    pub fn events(&self) -> BusSubscription<PageEvent> {
        self.inner.events.subscribe()
    }

    /// Messages this page sends to its worker.
    pub fn outbox(&self) -> BusSubscription<PageMessage> {
        self.inner.outbox.subscribe()
    }

    /// Whether the worker answered the last liveness probe.
    pub fn is_worker_responsive(&self) -> bool {
        self.inner.worker_responsive.load(Ordering::SeqCst)
    }

    /// Sends the liveness `PING` for a newly registered worker. No reply is not an
    /// error; the worker simply stays unconfirmed.
    pub fn on_worker_registered(&self) {
        self.inner.worker_responsive.store(false, Ordering::SeqCst);
        if self.inner.outbox.publish(PageMessage::Ping) == 0 {
            LOGGER.debug("PING dropped: no worker channel attached");
        }
    }

    /// Parses and handles a raw envelope received from the worker channel.
    pub fn handle_raw(&self, raw: &str) -> BusResult<()> {
        let envelope = WorkerEnvelope::from_json(raw).inspect_err(|err| {
            LOGGER.debug(format!("Ignoring message from worker: {err}"));
        })?;
        self.handle_envelope(&envelope);
        Ok(())
    }

    pub fn handle_envelope(&self, envelope: &WorkerEnvelope) {
        let inner = &self.inner;
        match &envelope.message {
            WorkerMessage::Offline { message } => {
                inner
                    .banners
                    .show(Banner::new(BannerKind::Offline, message.clone(), None));
                inner.events.publish(PageEvent::Offline {
                    message: message.clone(),
                });
            }
            WorkerMessage::ServerError { message, status } => {
                inner.banners.show(Banner::new(
                    BannerKind::ServerError,
                    message.clone(),
                    *status,
                ));
                inner.events.publish(PageEvent::ServerError {
                    message: message.clone(),
                    status: *status,
                });
            }
            WorkerMessage::ServingCached => LOGGER.info("Serving content from cache"),
            WorkerMessage::SyncComplete => LOGGER.info("Background sync complete"),
            WorkerMessage::PeriodicSyncComplete => LOGGER.info("Periodic sync complete"),
            WorkerMessage::Pong => {
                inner.worker_responsive.store(true, Ordering::SeqCst);
                LOGGER.debug("Worker answered PING");
            }
            WorkerMessage::Navigate { url } => {
                if url.is_empty() || is_current_location(&inner.location.href(), url) {
                    return;
                }
                LOGGER.info(format!("Navigating to {url}"));
                inner.location.navigate(url);
                inner.events.publish(PageEvent::Navigated { url: url.clone() });
            }
        }
    }

    /// Drains `inbox` until every worker handle is gone.
    pub async fn run(&self, inbox: BusSubscription<WorkerEnvelope>) {
        while let Some(envelope) = inbox.recv().await {
            self.handle_envelope(&envelope);
        }
    }
}

/// Whether `target`, resolved against `current`, names the document already shown.
/// Fragments are ignored.
fn is_current_location(current: &str, target: &str) -> bool {
    let Ok(mut current_url) = Url::parse(current) else {
        return current == target;
    };
    let Ok(mut target_url) = current_url.join(target) else {
        return false;
    };
    current_url.set_fragment(None);
    target_url.set_fragment(None);
    current_url == target_url
}
