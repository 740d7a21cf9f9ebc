//! Subscription seam: typed deliveries with explicit acknowledgement.

use crate::error::BrokerError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;

/// Stream of decoded deliveries for one topic.
///
/// An `Err` item carrying [`BrokerError::MalformedMessage`] means the payload
/// was dropped (terminated on the broker) and the consumer should stop.
pub type Subscription<T> = BoxStream<'static, Result<Delivery<T>, BrokerError>>;

/// A decoded message together with the handle used to settle it.
pub struct Delivery<T> {
    /// Decoded payload.
    pub payload: T,
    /// Position of the message in the topic log.
    pub sequence: u64,
    /// How many times the broker has handed this message out.
    pub delivery_count: u64,
    acker: Acker,
}

pub(crate) enum Acker {
    #[cfg(feature = "nats")]
    JetStream(async_nats::jetstream::Message),
    Memory(crate::memory::MemoryAck),
}

impl<T> Delivery<T> {
    pub(crate) fn new(payload: T, sequence: u64, delivery_count: u64, acker: Acker) -> Self {
        Self {
            payload,
            sequence,
            delivery_count,
            acker,
        }
    }

    pub fn is_redelivery(&self) -> bool {
        self.delivery_count > 1
    }

    /// Confirm the message has been handled; it will not be delivered again.
    pub async fn ack(&self) -> Result<(), BrokerError> {
        match &self.acker {
            #[cfg(feature = "nats")]
            Acker::JetStream(message) => message
                .ack()
                .await
                .map_err(|e| BrokerError::Ack(e.to_string())),
            Acker::Memory(handle) => handle.ack().await,
        }
    }

    /// Ask the broker to deliver the message again later.
    pub async fn nak(&self) -> Result<(), BrokerError> {
        match &self.acker {
            #[cfg(feature = "nats")]
            Acker::JetStream(message) => message
                .ack_with(async_nats::jetstream::AckKind::Nak(None))
                .await
                .map_err(|e| BrokerError::Ack(e.to_string())),
            Acker::Memory(handle) => handle.nak().await,
        }
    }

    /// Give up on the message for good; it will not be delivered again.
    pub async fn term(&self) -> Result<(), BrokerError> {
        match &self.acker {
            #[cfg(feature = "nats")]
            Acker::JetStream(message) => message
                .ack_with(async_nats::jetstream::AckKind::Term)
                .await
                .map_err(|e| BrokerError::Ack(e.to_string())),
            Acker::Memory(handle) => handle.term().await,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Delivery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("payload", &self.payload)
            .field("sequence", &self.sequence)
            .field("delivery_count", &self.delivery_count)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Attach a durable consumer to `topic` and stream its messages from the
    /// earliest one not yet acknowledged.
    async fn subscribe<T>(&self, topic: &str) -> Result<Subscription<T>, BrokerError>
    where
        T: DeserializeOwned + Send + 'static;
}
