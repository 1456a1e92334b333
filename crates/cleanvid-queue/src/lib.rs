//! Pub/sub coordination over Redis.
//!
//! This crate provides:
//! - Discovery and error announcements on `<prefix>/found` and `<prefix>/error`
//! - A bounded, cancellable wait for approvals on `<prefix>/to_clean`
//! - A `Broker` seam with Redis and in-memory implementations
//! - Retry with exponential backoff for transient broker failures

pub mod broker;
pub mod coordination;
pub mod error;
pub mod memory;
pub mod redis_broker;
pub mod retry;

pub use broker::{Broker, MessageStream};
pub use coordination::{decode_names, Approval, CoordinationClient, CoordinationConfig};
pub use error::{QueueError, QueueResult};
pub use memory::MemoryBroker;
pub use redis_broker::{BrokerConfig, RedisBroker};
pub use retry::{retry_async_when, FailureTracker, RetryConfig, RetryResult};
