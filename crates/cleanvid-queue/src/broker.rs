//! Pub/sub broker abstraction.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::QueueResult;

/// Stream of raw payloads received on one topic.
///
/// Dropping the stream unsubscribes.
pub type MessageStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// A publish/subscribe channel with at-least-once publishing.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish a payload on a topic.
    async fn publish(&self, topic: &str, payload: &str) -> QueueResult<()>;

    /// Subscribe to a topic.
    ///
    /// Messages published after this call returns are delivered on the stream.
    async fn subscribe(&self, topic: &str) -> QueueResult<MessageStream>;
}

#[async_trait]
impl<B: Broker + ?Sized> Broker for std::sync::Arc<B> {
    async fn publish(&self, topic: &str, payload: &str) -> QueueResult<()> {
        (**self).publish(topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> QueueResult<MessageStream> {
        (**self).subscribe(topic).await
    }
}
