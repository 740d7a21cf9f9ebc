//! NATS JetStream backend.
//!
//! A topic maps to one JetStream stream whose only subject is the topic
//! name. Subscriptions use a durable pull consumer with explicit acks, so a
//! restarted consumer resumes from the first unacknowledged message.
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging::nats::{JetStreamBroker, NatsConfig};
//! use messaging::{EventPublisher, TopicManager, TopicSpec};
//!
//! let broker = JetStreamBroker::new(NatsConfig::from_env()?);
//! broker.ensure_topic(&TopicSpec::new("purchases")).await?;
//! let outcome = broker.publish("purchases", &event).await;
//! ```

mod config;
mod connector;
mod publisher;
mod subscriber;
mod topics;

pub use config::{NatsConfig, DEFAULT_CONSUMER_NAME};
pub use connector::connect;

/// Broker backed by NATS JetStream.
///
/// Holds configuration only. Each operation opens its own connection and
/// releases it when done; a subscription keeps its connection for as long
/// as the stream is alive.
#[derive(Debug, Clone)]
pub struct JetStreamBroker {
    config: NatsConfig,
}

impl JetStreamBroker {
    pub fn new(config: NatsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    async fn context(&self) -> Result<async_nats::jetstream::Context, crate::BrokerError> {
        let client = connect(&self.config).await?;
        Ok(async_nats::jetstream::new(client))
    }
}
