//! Redis Pub/Sub broker.

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use tracing::debug;

use crate::broker::{Broker, MessageStream};
use crate::error::{QueueError, QueueResult};

/// Broker connection settings.
#[derive(Clone)]
pub struct BrokerConfig {
    /// Full Redis URL; overrides the individual fields when set
    pub url: Option<String>,
    /// Broker host
    pub address: String,
    /// Broker port
    pub port: u16,
    /// Username (empty for none)
    pub username: String,
    /// Password (empty for none)
    pub password: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: None,
            address: "localhost".to_string(),
            port: 6379,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl std::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

impl BrokerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from `var`, a lookup over `BROKER_*` variable names.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            url: var("BROKER_URL").filter(|s| !s.is_empty()),
            address: var("BROKER_ADDRESS").unwrap_or(defaults.address),
            port: var("BROKER_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            username: var("BROKER_USER").unwrap_or_default(),
            password: var("BROKER_PASS").unwrap_or_default(),
        }
    }

    /// Redis URL for these settings, with credentials percent-encoded.
    pub fn redis_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        let auth = match (self.username.is_empty(), self.password.is_empty()) {
            (true, true) => String::new(),
            (false, true) => format!("{}@", urlencoding::encode(&self.username)),
            (_, false) => format!(
                "{}:{}@",
                urlencoding::encode(&self.username),
                urlencoding::encode(&self.password)
            ),
        };

        format!("redis://{}{}:{}/", auth, self.address, self.port)
    }
}

/// Broker backed by Redis `PUBLISH`/`SUBSCRIBE`.
pub struct RedisBroker {
    client: redis::Client,
}

impl RedisBroker {
    pub fn new(config: &BrokerConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url().as_str())
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;
        Ok(Self { client })
    }

    /// Check the broker answers `PING`.
    pub async fn ping(&self) -> QueueResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn publish(&self, topic: &str, payload: &str) -> QueueResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;

        debug!("Publishing to {}: {}", topic, payload);
        let receivers: i64 = conn
            .publish(topic, payload)
            .await
            .map_err(|e| QueueError::publish_failed(e.to_string()))?;
        debug!("{} subscriber(s) received message on {}", receivers, topic);

        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> QueueResult<MessageStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;

        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| QueueError::subscribe_failed(e.to_string()))?;
        debug!("Subscribed to {}", topic);

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            msg.get_payload::<String>().ok()
        });

        Ok(Box::pin(stream))
    }
}
