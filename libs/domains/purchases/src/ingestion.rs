//! Producer side: stamp, ensure the topic, publish.

use crate::clock::{Clock, SystemClock};
use crate::error::{PurchaseError, Result};
use crate::models::PurchaseEvent;
use messaging::{EventPublisher, PublishOutcome, TopicManager, TopicSpec};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Accepts purchases and hands them to the broker.
pub struct IngestionService<B> {
    broker: B,
    topic: TopicSpec,
    clock: Arc<dyn Clock>,
}

impl<B> IngestionService<B>
where
    B: TopicManager + EventPublisher,
{
    pub fn new(broker: B, topic: TopicSpec) -> Self {
        Self {
            broker,
            topic,
            clock: Arc::new(SystemClock::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn topic(&self) -> &TopicSpec {
        &self.topic
    }

    /// Stamp `payload` with the receipt time and publish it.
    ///
    /// Fails only when the topic cannot be ensured. A publish the broker
    /// did not confirm is logged and reported through the outcome.
    #[instrument(skip(self, payload), fields(topic = %self.topic.name))]
    pub async fn ingest(
        &self,
        payload: Map<String, Value>,
    ) -> Result<(PurchaseEvent, PublishOutcome)> {
        let event = PurchaseEvent::stamp(payload, self.clock.now());

        self.broker
            .ensure_topic(&self.topic)
            .await
            .map_err(PurchaseError::Topic)?;

        let outcome = self.broker.publish(&self.topic.name, &event).await;
        match &outcome {
            PublishOutcome::Acknowledged { sequence } => {
                info!(timestamp = %event.timestamp, sequence, "Purchase published");
            }
            PublishOutcome::Dropped { reason } => {
                warn!(
                    timestamp = %event.timestamp,
                    reason = %reason,
                    "Purchase publish not confirmed"
                );
            }
        }

        Ok((event, outcome))
    }

    /// Whether the broker is reachable.
    pub async fn ready(&self) -> Result<()> {
        self.broker.ping().await.map_err(PurchaseError::Topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{FixedOffset, TimeZone};
    use messaging::InMemoryBroker;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("object expected"),
        }
    }

    fn fixed_clock() -> Arc<dyn Clock> {
        let at = FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .unwrap();
        Arc::new(FixedClock::new(at))
    }

    #[tokio::test]
    async fn test_ingest_creates_topic_and_publishes() {
        let broker = InMemoryBroker::new();
        let service = IngestionService::new(broker.clone(), TopicSpec::new("purchases"))
            .with_clock(fixed_clock());

        let (event, outcome) = service.ingest(payload(json!({"item": "book"}))).await.unwrap();

        assert!(outcome.is_acknowledged());
        assert_eq!(event.timestamp.as_str(), "2024-05-01T12:00:00.000000+03:00");
        assert!(broker.topic_exists("purchases").await);
        assert_eq!(
            broker.messages("purchases").await,
            vec![json!({"item": "book", "timestamp": "2024-05-01T12:00:00.000000+03:00"})]
        );
    }

    #[tokio::test]
    async fn test_dropped_publish_still_succeeds() {
        let broker = InMemoryBroker::new();
        broker.set_drop_publishes(true);
        let service = IngestionService::new(broker.clone(), TopicSpec::new("purchases"));

        let (_, outcome) = service.ingest(payload(json!({"item": "book"}))).await.unwrap();

        assert!(!outcome.is_acknowledged());
        assert!(broker.messages("purchases").await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_broker_fails_topic_step() {
        let broker = InMemoryBroker::new();
        broker.set_unreachable(true);
        let service = IngestionService::new(broker, TopicSpec::new("purchases"));

        let err = service.ingest(payload(json!({"item": "book"}))).await.unwrap_err();
        assert!(matches!(err, PurchaseError::Topic(_)));
        assert!(service.ready().await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_topic_fails() {
        let service = IngestionService::new(
            InMemoryBroker::new(),
            TopicSpec::new("purchases").with_partitions(3),
        );

        let err = service.ingest(payload(json!({}))).await.unwrap_err();
        assert!(matches!(err, PurchaseError::Topic(_)));
    }
}
