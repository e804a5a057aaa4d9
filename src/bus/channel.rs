use std::sync::{Arc, Mutex};

use async_channel::{Receiver, Sender, TryRecvError};

use crate::bus::logger::LOGGER;

/// Fan-out channel: every message published reaches every live subscription once.
///
/// Each subscription has its own unbounded queue, so a slow listener never blocks the
/// publisher or other listeners. Messages from one publisher arrive in publish order.
/// Subscriptions that were dropped are pruned on the next publish.
pub struct MessageBus<T> {
    subscribers: Arc<Mutex<Vec<Sender<T>>>>,
}

impl<T> Clone for MessageBus<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for MessageBus<T> {
    fn default() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone + Send + 'static> MessageBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> BusSubscription<T> {
        let (sender, receiver) = async_channel::unbounded();
        self.subscribers.lock().unwrap().push(sender);
        BusSubscription { receiver }
    }

    /// Delivers `message` to every live subscription and returns how many received it.
    pub fn publish(&self, message: T) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        let before = subscribers.len();
        subscribers.retain(|sender| sender.try_send(message.clone()).is_ok());
        let pruned = before - subscribers.len();
        if pruned > 0 {
            log::debug!("pruned {pruned} closed bus subscription(s)");
        }
        if subscribers.is_empty() {
            LOGGER.debug("Message published with no listeners");
        }
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|sender| !sender.is_closed());
        subscribers.len()
    }
}

/// Receiving end of a [`MessageBus`]. Dropping it unsubscribes.
pub struct BusSubscription<T> {
    receiver: Receiver<T>,
}

impl<T> BusSubscription<T> {
    /// Waits for the next message. Returns `None` once every bus handle is gone and the
    /// queue is drained.
    pub async fn recv(&self) -> Option<T> {
        self.receiver.recv().await.ok()
    }

    pub fn try_recv(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Takes every message currently queued.
    pub fn drain(&self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_each_message_once_in_order() {
        let bus = MessageBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        assert_eq!(bus.publish(1), 2);
        assert_eq!(bus.publish(2), 2);

        assert_eq!(first.drain(), vec![1, 2]);
        assert_eq!(second.drain(), vec![1, 2]);
        assert!(first.try_recv().is_none());
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let bus = MessageBus::new();
        let kept = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);

        assert_eq!(bus.publish("hello"), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv(), Some("hello"));
    }

    #[test]
    fn late_subscribers_miss_earlier_messages() {
        let bus = MessageBus::new();
        assert_eq!(bus.publish(7), 0);
        let late = bus.subscribe();
        assert!(late.try_recv().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn recv_waits_for_publish() {
        let bus = MessageBus::new();
        let subscription = bus.subscribe();
        let publisher = bus.clone();
        tokio::spawn(async move {
            publisher.publish(String::from("ready"));
        });
        assert_eq!(subscription.recv().await.as_deref(), Some("ready"));
    }
}
