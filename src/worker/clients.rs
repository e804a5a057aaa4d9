use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::bus::{BusSubscription, MessageBus, WorkerEnvelope};
use crate::worker::error::{client_not_found, WorkerResult};

/// A page window the worker can reach.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: Url,
    pub focused: bool,
    /// Whether this worker generation controls the page.
    pub controlled: bool,
}

/// Host binding for the worker's window clients.
#[async_trait]
pub trait WindowClients: Send + Sync {
    async fn match_all(&self) -> Vec<WindowClient>;

    /// Takes control of every open page without a reload. Returns how many were
    /// claimed.
    async fn claim(&self) -> WorkerResult<usize>;

    async fn focus(&self, id: &str) -> WorkerResult<WindowClient>;

    async fn open_window(&self, url: &Url) -> WorkerResult<WindowClient>;

    async fn post_message(&self, id: &str, envelope: &WorkerEnvelope) -> WorkerResult<()>;
}

struct ClientSlot {
    client: WindowClient,
    inbox: MessageBus<WorkerEnvelope>,
}

/// In-process window clients, each backed by its own message bus.
///
/// Pages join with [`InMemoryClients::connect`] and read worker envelopes from the
/// returned subscription.
#[derive(Default)]
pub struct InMemoryClients {
    slots: Mutex<BTreeMap<String, ClientSlot>>,
    opened: Mutex<Vec<Url>>,
}

impl InMemoryClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, url: Url) -> (WindowClient, BusSubscription<WorkerEnvelope>) {
        let client = WindowClient {
            id: format!("client-{:016x}", rand::random::<u64>()),
            url,
            focused: false,
            controlled: false,
        };
        let inbox = MessageBus::new();
        let subscription = inbox.subscribe();
        self.slots.lock().unwrap().insert(
            client.id.clone(),
            ClientSlot {
                client: client.clone(),
                inbox,
            },
        );
        (client, subscription)
    }

    pub fn disconnect(&self, id: &str) -> bool {
        self.slots.lock().unwrap().remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<WindowClient> {
        self.slots
            .lock()
            .unwrap()
            .get(id)
            .map(|slot| slot.client.clone())
    }

    /// URLs passed to `open_window`, in call order.
    pub fn opened_windows(&self) -> Vec<Url> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl WindowClients for InMemoryClients {
    async fn match_all(&self) -> Vec<WindowClient> {
        self.slots
            .lock()
            .unwrap()
            .values()
            .map(|slot| slot.client.clone())
            .collect()
    }

    async fn claim(&self) -> WorkerResult<usize> {
        let mut slots = self.slots.lock().unwrap();
        let mut claimed = 0;
        for slot in slots.values_mut() {
            if !slot.client.controlled {
                slot.client.controlled = true;
                claimed += 1;
            }
        }
        Ok(claimed)
    }

    async fn focus(&self, id: &str) -> WorkerResult<WindowClient> {
        let mut slots = self.slots.lock().unwrap();
        if !slots.contains_key(id) {
            return Err(client_not_found(id));
        }
        for (slot_id, slot) in slots.iter_mut() {
            slot.client.focused = slot_id == id;
        }
        Ok(slots[id].client.clone())
    }

    async fn open_window(&self, url: &Url) -> WorkerResult<WindowClient> {
        self.opened.lock().unwrap().push(url.clone());
        let (client, subscription) = self.connect(url.clone());
        // Nobody listens to a window opened by the worker until its page connects.
        drop(subscription);
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(&client.id) {
            slot.client.controlled = true;
            slot.client.focused = true;
            return Ok(slot.client.clone());
        }
        Ok(client)
    }

    async fn post_message(&self, id: &str, envelope: &WorkerEnvelope) -> WorkerResult<()> {
        let slots = self.slots.lock().unwrap();
        let slot = slots.get(id).ok_or_else(|| client_not_found(id))?;
        slot.inbox.publish(envelope.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::WorkerMessage;

    fn url(path: &str) -> Url {
        Url::parse("https://app.test/").unwrap().join(path).unwrap()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn claim_controls_every_open_page_once() {
        let clients = InMemoryClients::new();
        clients.connect(url("/"));
        clients.connect(url("/inbox"));

        assert_eq!(clients.claim().await.unwrap(), 2);
        assert_eq!(clients.claim().await.unwrap(), 0);
        assert!(clients.match_all().await.iter().all(|client| client.controlled));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn messages_reach_only_the_addressed_page() {
        let clients = InMemoryClients::new();
        let (first, first_inbox) = clients.connect(url("/"));
        let (_, second_inbox) = clients.connect(url("/inbox"));

        clients
            .post_message(&first.id, &WorkerEnvelope::new(WorkerMessage::Pong))
            .await
            .unwrap();

        assert_eq!(first_inbox.try_recv().unwrap().message, WorkerMessage::Pong);
        assert!(second_inbox.try_recv().is_none());
        let err = clients
            .post_message("client-missing", &WorkerEnvelope::new(WorkerMessage::Pong))
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "worker/client-not-found");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn focus_moves_between_windows() {
        let clients = InMemoryClients::new();
        let (first, _a) = clients.connect(url("/"));
        let (second, _b) = clients.connect(url("/inbox"));

        clients.focus(&first.id).await.unwrap();
        let focused = clients.focus(&second.id).await.unwrap();

        assert!(focused.focused);
        assert!(!clients.get(&first.id).unwrap().focused);
    }
}
