use super::JetStreamBroker;
use crate::publisher::{EventPublisher, PublishOutcome};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument, warn};

impl JetStreamBroker {
    async fn try_publish<T>(&self, topic: &str, event: &T) -> Result<u64, String>
    where
        T: Serialize + Send + Sync,
    {
        let payload = serde_json::to_vec(event).map_err(|e| e.to_string())?;
        let jetstream = self.context().await.map_err(|e| e.to_string())?;

        let ack_future = jetstream
            .publish(topic.to_string(), payload.into())
            .await
            .map_err(|e| e.to_string())?;

        let ack = tokio::time::timeout(self.config.publish_timeout, ack_future)
            .await
            .map_err(|_| {
                format!(
                    "no acknowledgment within {}ms",
                    self.config.publish_timeout.as_millis()
                )
            })?
            .map_err(|e| e.to_string())?;

        Ok(ack.sequence)
    }
}

#[async_trait]
impl EventPublisher for JetStreamBroker {
    #[instrument(skip(self, event), fields(topic = %topic))]
    async fn publish<T>(&self, topic: &str, event: &T) -> PublishOutcome
    where
        T: Serialize + Send + Sync,
    {
        match self.try_publish(topic, event).await {
            Ok(sequence) => {
                metrics::counter!("broker_publish_total", "outcome" => "acknowledged").increment(1);
                debug!(sequence, "Published event");
                PublishOutcome::Acknowledged { sequence }
            }
            Err(reason) => {
                metrics::counter!("broker_publish_total", "outcome" => "dropped").increment(1);
                warn!(error = %reason, "Publish was not acknowledged");
                PublishOutcome::Dropped { reason }
            }
        }
    }
}
