//! Discovery, approval and error coordination over pub/sub.
//!
//! Every message on the wire is a JSON array of names:
//! - `<prefix>/found`: units discovered under the watched root (published)
//! - `<prefix>/to_clean`: units approved for cleaning (consumed)
//! - `<prefix>/error`: file names that failed to clean (published)

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use cleanvid_models::{Channel, NameSet, Topics};

use crate::broker::{Broker, MessageStream};
use crate::error::{QueueError, QueueResult};
use crate::retry::{retry_async_when, RetryConfig, RetryResult};

/// Coordination settings.
#[derive(Debug, Clone)]
pub struct CoordinationConfig {
    /// Topic prefix
    pub topics: Topics,
    /// Upper bound on waiting for a `to_clean` message
    pub approval_timeout: Duration,
    /// Backoff for broker calls
    pub retry: RetryConfig,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            topics: Topics::default(),
            approval_timeout: Duration::from_secs(300),
            retry: RetryConfig::new("broker"),
        }
    }
}

/// Outcome of waiting for an approval message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    /// Units named in the first well-formed `to_clean` message
    Approved(NameSet),
    /// No message before the deadline
    TimedOut,
    /// Shutdown was requested while waiting
    Cancelled,
    /// The subscription ended before a message arrived
    Disconnected,
}

/// Client for the monitor's three coordination channels.
pub struct CoordinationClient<B> {
    broker: B,
    config: CoordinationConfig,
}

impl<B: Broker> CoordinationClient<B> {
    pub fn new(broker: B, config: CoordinationConfig) -> Self {
        Self { broker, config }
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn topics(&self) -> &Topics {
        &self.config.topics
    }

    /// Announce newly discovered units. No-op for an empty set.
    pub async fn publish_found(&self, units: &NameSet) -> QueueResult<()> {
        if units.is_empty() {
            return Ok(());
        }
        info!("Announcing new units: {}", units);
        self.publish_names(Channel::Found, units).await
    }

    /// Report files that failed to clean. No-op for an empty set.
    pub async fn publish_errors(&self, files: &NameSet) -> QueueResult<()> {
        if files.is_empty() {
            return Ok(());
        }
        warn!("Reporting failed files: {}", files);
        self.publish_names(Channel::Error, files).await
    }

    /// Subscribe to `to_clean` and wait for one approval message.
    ///
    /// The subscription is dropped (unsubscribed) before returning. Only
    /// failing to open the subscription is an error; timeout, shutdown and
    /// a lost subscription are reported through [`Approval`].
    pub async fn await_approval(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> QueueResult<Approval> {
        let stream = self.open_approvals().await?;
        Ok(self.wait_for_approval(stream, shutdown).await)
    }

    /// Announce `units` and wait for the matching approval.
    ///
    /// Subscribes to `to_clean` before publishing on `found`, so an approval
    /// sent immediately after the announcement is not missed. An `Err` means
    /// the units were not announced.
    pub async fn announce(
        &self,
        units: &NameSet,
        shutdown: &mut watch::Receiver<bool>,
    ) -> QueueResult<Approval> {
        if units.is_empty() {
            return Ok(Approval::Approved(NameSet::new()));
        }

        let stream = self.open_approvals().await?;
        self.publish_found(units).await?;

        info!("Waiting to hear if new units should be cleaned...");
        Ok(self.wait_for_approval(stream, shutdown).await)
    }

    async fn publish_names(&self, channel: Channel, names: &NameSet) -> QueueResult<()> {
        let topic = self.config.topics.topic(channel);
        let payload = serde_json::to_string(names)?;
        let retry = self.config.retry.named(format!("publish {}", topic));

        let topic = topic.as_str();
        let payload = payload.as_str();
        let result = retry_async_when(
            &retry,
            || self.broker.publish(topic, payload),
            QueueError::is_transient,
        )
        .await;
        settle(&retry, result)
    }

    async fn open_approvals(&self) -> QueueResult<MessageStream> {
        let topic = self.config.topics.topic(Channel::ToClean);
        let retry = self.config.retry.named(format!("subscribe {}", topic));

        let topic = topic.as_str();
        let result = retry_async_when(
            &retry,
            || self.broker.subscribe(topic),
            QueueError::is_transient,
        )
        .await;
        settle(&retry, result)
    }

    async fn wait_for_approval(
        &self,
        mut stream: MessageStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Approval {
        if *shutdown.borrow() {
            return Approval::Cancelled;
        }

        let deadline = tokio::time::sleep(self.config.approval_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(
                        "No approval received within {:?}, continuing without new approvals",
                        self.config.approval_timeout
                    );
                    return Approval::TimedOut;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested while waiting for approval");
                        return Approval::Cancelled;
                    }
                }
                message = stream.next() => match message {
                    Some(payload) => match decode_names(&payload) {
                        Ok(names) => {
                            info!("Now monitoring: {}", names);
                            return Approval::Approved(names);
                        }
                        Err(e) => warn!("Ignoring malformed approval message {:?}: {}", payload, e),
                    },
                    None => {
                        warn!("Approval subscription closed before a message arrived");
                        return Approval::Disconnected;
                    }
                },
            }
        }
    }
}

fn settle<T>(retry: &RetryConfig, result: RetryResult<T, QueueError>) -> QueueResult<T> {
    if let Some(attempts) = result.attempts() {
        debug!("{} gave up after {} attempts", retry.operation_name, attempts);
    }
    result.into_result()
}

/// Decode a coordination payload (a JSON array of names).
pub fn decode_names(payload: &str) -> QueueResult<NameSet> {
    let names: NameSet = serde_json::from_str(payload)
        .map_err(|e| QueueError::invalid_payload(e.to_string()))?;
    debug!("Decoded {} names", names.len());
    Ok(names)
}
