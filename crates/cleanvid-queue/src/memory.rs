//! In-process broker.
//!
//! Used by tests and for running the monitor without a Redis instance.
//! Every published message is also recorded so callers can inspect what
//! went out on each topic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::broker::{Broker, MessageStream};
use crate::error::{QueueError, QueueResult};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct Inner {
    channels: HashMap<String, broadcast::Sender<String>>,
    published: Vec<(String, String)>,
    unavailable: bool,
}

/// Broker that delivers messages within the current process.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate an outage: every publish and subscribe fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Payloads published on `topic`, oldest first.
    pub fn published(&self, topic: &str) -> Vec<String> {
        self.lock()
            .published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock()
            .channels
            .get(topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Wait until someone subscribes to `topic`.
    pub async fn wait_for_subscriber(&self, topic: &str) {
        while self.subscriber_count(topic) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, topic: &str, payload: &str) -> QueueResult<()> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(QueueError::connection_failed("memory broker unavailable"));
        }

        inner
            .published
            .push((topic.to_string(), payload.to_string()));

        if let Some(tx) = inner.channels.get(topic) {
            // No receivers is not an error for pub/sub.
            let _ = tx.send(payload.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> QueueResult<MessageStream> {
        let rx = {
            let mut inner = self.lock();
            if inner.unavailable {
                return Err(QueueError::connection_failed("memory broker unavailable"));
            }
            inner
                .channels
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe()
        };

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => return Some((payload, rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let broker = MemoryBroker::new();
        let mut stream = broker.subscribe("cleanvid/to_clean").await.unwrap();

        broker.publish("cleanvid/to_clean", r#"["ShowB"]"#).await.unwrap();

        assert_eq!(stream.next().await.as_deref(), Some(r#"["ShowB"]"#));
        assert_eq!(broker.published("cleanvid/to_clean"), vec![r#"["ShowB"]"#]);
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let broker = MemoryBroker::new();
        let stream = broker.subscribe("t").await.unwrap();
        assert_eq!(broker.subscriber_count("t"), 1);

        drop(stream);
        assert_eq!(broker.subscriber_count("t"), 0);
    }

    #[tokio::test]
    async fn test_unavailable_broker_fails() {
        let broker = MemoryBroker::new();
        broker.set_unavailable(true);

        assert!(broker.publish("t", "[]").await.unwrap_err().is_transient());
        assert!(broker.subscribe("t").await.is_err());
        assert!(broker.published("t").is_empty());
    }
}
