//! Persistence worker: drains the purchase topic into the store.

use crate::config::WorkerConfig;
use crate::error::{PurchaseError, WorkerError};
use crate::models::PurchaseEvent;
use crate::repository::{InsertOutcome, PurchaseRepository};
use database::common::{RetryConfig, retry_with_backoff_if};
use futures::StreamExt;
use messaging::{BrokerError, Delivery, EventSubscriber, TopicManager, TopicSpec};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

/// Long-lived consumer that stores every purchase exactly once.
///
/// Messages are acknowledged only after the store accepted them or reported
/// them as duplicates, so a crash between the two is repaired by redelivery.
pub struct PersistenceWorker<S, R> {
    broker: S,
    repository: R,
    topic: TopicSpec,
    retry: RetryConfig,
}

impl<S, R> PersistenceWorker<S, R>
where
    S: TopicManager + EventSubscriber,
    R: PurchaseRepository,
{
    pub fn new(broker: S, repository: R, topic: TopicSpec) -> Self {
        Self {
            broker,
            repository,
            topic,
            retry: WorkerConfig::default().retry_policy(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Run until `shutdown` fires or a fatal error occurs.
    ///
    /// Shutdown is honoured at every await point. A message interrupted
    /// before its acknowledgement stays pending on the broker.
    #[instrument(skip_all, fields(topic = %self.topic.name))]
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), WorkerError> {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Persistence worker stopping");
                Ok(())
            }
            result = self.drain() => {
                if let Err(e) = &result {
                    error!(error = %e, "Persistence worker failed");
                }
                result
            }
        }
    }

    async fn drain(&self) -> Result<(), WorkerError> {
        self.broker.ensure_topic(&self.topic).await?;
        let mut deliveries = self
            .broker
            .subscribe::<PurchaseEvent>(&self.topic.name)
            .await?;
        info!("Persistence worker subscribed");

        while let Some(delivery) = deliveries.next().await {
            let delivery = delivery?;
            self.persist(&delivery).await?;
        }

        Err(BrokerError::SubscriptionClosed(self.topic.name.clone()).into())
    }

    #[instrument(
        skip_all,
        fields(sequence = delivery.sequence, timestamp = %delivery.payload.timestamp)
    )]
    async fn persist(&self, delivery: &Delivery<PurchaseEvent>) -> Result<(), WorkerError> {
        let event = &delivery.payload;
        if delivery.is_redelivery() {
            debug!(delivery_count = delivery.delivery_count, "Redelivered purchase");
        }

        let attempts = &AtomicU32::new(0);
        let repository = &self.repository;
        let stored = retry_with_backoff_if(
            move || async move {
                if attempts.fetch_add(1, Ordering::Relaxed) > 0 {
                    metrics::counter!("purchases_store_retries_total").increment(1);
                }
                repository.insert(event).await
            },
            self.retry.clone(),
            PurchaseError::is_transient,
        )
        .await;

        match stored {
            Ok(InsertOutcome::Inserted { id }) => {
                metrics::counter!("purchases_persisted_total").increment(1);
                debug!(id = %id, "Purchase stored");
            }
            Ok(InsertOutcome::Duplicate) => {
                metrics::counter!("purchases_duplicates_total").increment(1);
                debug!("Duplicate purchase discarded");
            }
            Err(source) if !source.is_transient() => {
                // Redelivery cannot fix it, so drop it and keep draining.
                metrics::counter!("purchases_rejected_total").increment(1);
                error!(error = %source, "Purchase rejected by the store, terminating it");
                delivery.term().await?;
                return Ok(());
            }
            Err(source) => {
                if let Err(e) = delivery.nak().await {
                    warn!(error = %e, "Failed to return purchase to the broker");
                }
                return Err(WorkerError::Persist {
                    timestamp: event.timestamp.to_string(),
                    source,
                });
            }
        }

        delivery.ack().await?;
        Ok(())
    }
}
