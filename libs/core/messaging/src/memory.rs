//! In-process broker used by tests and local wiring.
//!
//! Topics are append-only logs. Every subscriber gets each message that has
//! not been acknowledged yet, and a nak puts the message back on the
//! subscribers' queues.

use crate::error::BrokerError;
use crate::publisher::{EventPublisher, PublishOutcome};
use crate::subscriber::{Acker, Delivery, EventSubscriber, Subscription};
use crate::topic::{TopicManager, TopicSpec};
use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct TopicLog {
    spec: Option<TopicSpec>,
    messages: Vec<Vec<u8>>,
    deliveries: HashMap<u64, u64>,
    acked: HashSet<u64>,
    terminated: HashSet<u64>,
    subscribers: Vec<UnboundedSender<u64>>,
}

impl TopicLog {
    fn dispatch(&mut self, sequence: u64) {
        self.subscribers
            .retain(|tx| tx.unbounded_send(sequence).is_ok());
    }
}

type SharedState = Arc<Mutex<HashMap<String, TopicLog>>>;

/// Broker that keeps everything in memory.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    topics: SharedState,
    unreachable: Arc<AtomicBool>,
    drop_publishes: Arc<AtomicBool>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `ping` and `ensure_topic` fail with a connection error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make every publish come back unconfirmed.
    pub fn set_drop_publishes(&self, drop: bool) {
        self.drop_publishes.store(drop, Ordering::SeqCst);
    }

    /// Append raw bytes to a topic, bypassing serialization.
    pub async fn publish_raw(&self, topic: &str, payload: Vec<u8>) -> Option<u64> {
        let mut topics = self.topics.lock().await;
        let log = topics.get_mut(topic)?;
        log.messages.push(payload);
        let sequence = log.messages.len() as u64;
        log.dispatch(sequence);
        Some(sequence)
    }

    pub async fn topic_exists(&self, topic: &str) -> bool {
        self.topics.lock().await.contains_key(topic)
    }

    /// Decoded copies of every message ever published to `topic`.
    pub async fn messages(&self, topic: &str) -> Vec<serde_json::Value> {
        let topics = self.topics.lock().await;
        topics
            .get(topic)
            .map(|log| {
                log.messages
                    .iter()
                    .filter_map(|raw| serde_json::from_slice(raw).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn acked_sequences(&self, topic: &str) -> Vec<u64> {
        let topics = self.topics.lock().await;
        topics
            .get(topic)
            .map(|log| sorted(&log.acked))
            .unwrap_or_default()
    }

    pub async fn terminated_sequences(&self, topic: &str) -> Vec<u64> {
        let topics = self.topics.lock().await;
        topics
            .get(topic)
            .map(|log| sorted(&log.terminated))
            .unwrap_or_default()
    }
}

fn sorted(set: &HashSet<u64>) -> Vec<u64> {
    let mut out: Vec<u64> = set.iter().copied().collect();
    out.sort_unstable();
    out
}

/// Settlement handle for a message delivered by [`InMemoryBroker`].
pub(crate) struct MemoryAck {
    topics: SharedState,
    topic: String,
    sequence: u64,
}

impl MemoryAck {
    pub(crate) async fn ack(&self) -> Result<(), BrokerError> {
        let mut topics = self.topics.lock().await;
        let log = topics
            .get_mut(&self.topic)
            .ok_or_else(|| BrokerError::TopicNotFound(self.topic.clone()))?;
        log.acked.insert(self.sequence);
        Ok(())
    }

    pub(crate) async fn nak(&self) -> Result<(), BrokerError> {
        let mut topics = self.topics.lock().await;
        let log = topics
            .get_mut(&self.topic)
            .ok_or_else(|| BrokerError::TopicNotFound(self.topic.clone()))?;
        if !log.acked.contains(&self.sequence) {
            log.dispatch(self.sequence);
        }
        Ok(())
    }

    pub(crate) async fn term(&self) -> Result<(), BrokerError> {
        let mut topics = self.topics.lock().await;
        let log = topics
            .get_mut(&self.topic)
            .ok_or_else(|| BrokerError::TopicNotFound(self.topic.clone()))?;
        log.terminated.insert(self.sequence);
        Ok(())
    }
}

#[async_trait]
impl TopicManager for InMemoryBroker {
    async fn ensure_topic(&self, spec: &TopicSpec) -> Result<(), BrokerError> {
        spec.validate()?;
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(BrokerError::Connect("in-memory broker marked unreachable".into()));
        }

        let mut topics = self.topics.lock().await;
        let log = topics.entry(spec.name.clone()).or_default();
        if log.spec.is_none() {
            debug!(topic = %spec.name, "Created in-memory topic");
            log.spec = Some(spec.clone());
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(BrokerError::Connect("in-memory broker marked unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for InMemoryBroker {
    async fn publish<T>(&self, topic: &str, event: &T) -> PublishOutcome
    where
        T: Serialize + Send + Sync,
    {
        if self.drop_publishes.load(Ordering::SeqCst) {
            return PublishOutcome::Dropped {
                reason: "publish dropped by in-memory broker".into(),
            };
        }

        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                return PublishOutcome::Dropped {
                    reason: e.to_string(),
                }
            }
        };

        match self.publish_raw(topic, payload).await {
            Some(sequence) => PublishOutcome::Acknowledged { sequence },
            None => PublishOutcome::Dropped {
                reason: format!("no topic '{topic}'"),
            },
        }
    }
}

#[async_trait]
impl EventSubscriber for InMemoryBroker {
    async fn subscribe<T>(&self, topic: &str) -> Result<Subscription<T>, BrokerError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded::<u64>();
        {
            let mut topics = self.topics.lock().await;
            let log = topics
                .get_mut(topic)
                .ok_or_else(|| BrokerError::TopicNotFound(topic.to_string()))?;
            for sequence in 1..=log.messages.len() as u64 {
                if !log.acked.contains(&sequence) && !log.terminated.contains(&sequence) {
                    let _ = tx.unbounded_send(sequence);
                }
            }
            log.subscribers.push(tx);
        }

        let topics = self.topics.clone();
        let topic = topic.to_string();
        let stream = rx.then(move |sequence| {
            let topics = topics.clone();
            let topic = topic.clone();
            async move { decode_delivery::<T>(topics, topic, sequence).await }
        });

        Ok(stream.boxed())
    }
}

async fn decode_delivery<T: DeserializeOwned>(
    topics: SharedState,
    topic: String,
    sequence: u64,
) -> Result<Delivery<T>, BrokerError> {
    let (raw, delivery_count) = {
        let mut guard = topics.lock().await;
        let log = guard
            .get_mut(&topic)
            .ok_or_else(|| BrokerError::TopicNotFound(topic.clone()))?;
        let raw = log
            .messages
            .get((sequence - 1) as usize)
            .cloned()
            .ok_or_else(|| BrokerError::SubscriptionClosed(topic.clone()))?;
        let count = log.deliveries.entry(sequence).or_insert(0);
        *count += 1;
        (raw, *count)
    };

    match serde_json::from_slice::<T>(&raw) {
        Ok(payload) => Ok(Delivery::new(
            payload,
            sequence,
            delivery_count,
            Acker::Memory(MemoryAck {
                topics,
                topic,
                sequence,
            }),
        )),
        Err(e) => {
            if let Some(log) = topics.lock().await.get_mut(&topic) {
                log.terminated.insert(sequence);
            }
            Err(BrokerError::MalformedMessage {
                sequence,
                reason: e.to_string(),
            })
        }
    }
}
