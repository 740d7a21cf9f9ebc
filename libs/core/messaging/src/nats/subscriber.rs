use super::JetStreamBroker;
use crate::error::BrokerError;
use crate::subscriber::{Acker, Delivery, EventSubscriber, Subscription};
use crate::topic::stream_name_for;
use async_nats::jetstream::consumer::pull::{Config as ConsumerConfig, MessagesErrorKind};
use async_nats::jetstream::consumer::{AckPolicy, DeliverPolicy};
use async_nats::jetstream::{AckKind, Message};
use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tracing::{error, info, instrument, warn};

#[async_trait]
impl EventSubscriber for JetStreamBroker {
    #[instrument(skip(self), fields(consumer = %self.config.consumer_name))]
    async fn subscribe<T>(&self, topic: &str) -> Result<Subscription<T>, BrokerError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let stream_name = stream_name_for(topic);
        let jetstream = self.context().await?;

        let stream = jetstream
            .get_stream(&stream_name)
            .await
            .map_err(|_| BrokerError::TopicNotFound(topic.to_string()))?;

        let consumer = stream
            .get_or_create_consumer(
                &self.config.consumer_name,
                ConsumerConfig {
                    durable_name: Some(self.config.consumer_name.clone()),
                    ack_policy: AckPolicy::Explicit,
                    deliver_policy: DeliverPolicy::All,
                    filter_subject: topic.to_string(),
                    ..Default::default()
                },
            )
            .await
            .map_err(BrokerError::consumer_error)?;

        let messages = consumer
            .messages()
            .await
            .map_err(BrokerError::consumer_error)?;

        info!(stream = %stream_name, "Subscribed");

        let topic = topic.to_string();
        let deliveries = messages.filter_map(move |item| {
            let topic = topic.clone();
            async move {
                match item {
                    Ok(message) => Some(decode::<T>(message).await),
                    Err(e) if is_terminal(e.kind()) => {
                        error!(topic = %topic, error = %e, "Consumer can no longer deliver");
                        Some(Err(BrokerError::consumer_error(e)))
                    }
                    Err(e) => {
                        warn!(topic = %topic, error = %e, "Error receiving message, continuing");
                        None
                    }
                }
            }
        });

        Ok(deliveries.boxed())
    }
}

/// Errors after which the pull consumer will not yield another message.
///
/// Missed heartbeats, failed pulls and missing responders happen while the
/// server restarts or fails over; the client keeps pulling through them.
fn is_terminal(kind: MessagesErrorKind) -> bool {
    matches!(
        kind,
        MessagesErrorKind::ConsumerDeleted | MessagesErrorKind::PushBasedConsumer
    )
}

async fn decode<T: DeserializeOwned>(message: Message) -> Result<Delivery<T>, BrokerError> {
    let (sequence, delivery_count) = match message.info() {
        Ok(info) => (info.stream_sequence, info.delivered.max(1) as u64),
        Err(e) => {
            warn!(error = %e, "Failed to read message info, using defaults");
            (0, 1)
        }
    };

    match serde_json::from_slice::<T>(&message.payload) {
        Ok(payload) => Ok(Delivery::new(
            payload,
            sequence,
            delivery_count,
            Acker::JetStream(message),
        )),
        Err(e) => {
            warn!(sequence, error = %e, "Undecodable message, terminating it");
            if let Err(term_err) = message.ack_with(AckKind::Term).await {
                warn!(error = %term_err, "Failed to terminate undecodable message");
            }
            Err(BrokerError::MalformedMessage {
                sequence,
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_consumer_is_terminal() {
        assert!(is_terminal(MessagesErrorKind::ConsumerDeleted));
        assert!(is_terminal(MessagesErrorKind::PushBasedConsumer));
    }

    #[test]
    fn test_connection_hiccups_are_not_terminal() {
        assert!(!is_terminal(MessagesErrorKind::MissingHeartbeat));
        assert!(!is_terminal(MessagesErrorKind::Pull));
        assert!(!is_terminal(MessagesErrorKind::NoResponders));
        assert!(!is_terminal(MessagesErrorKind::Other));
    }
}
