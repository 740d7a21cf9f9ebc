//! Topic descriptors and the topic administration seam.

use crate::error::BrokerError;
use async_trait::async_trait;

/// Description of a topic as the application wants it to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: u32,
    pub replication: u32,
}

impl TopicSpec {
    /// Single partition, single replica.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: 1,
            replication: 1,
        }
    }

    pub fn with_partitions(mut self, partitions: u32) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_replication(mut self, replication: u32) -> Self {
        self.replication = replication;
        self
    }

    /// Reject parameters a broker cannot honour.
    ///
    /// A JetStream stream is a single ordered log, so anything other than
    /// exactly one partition is refused rather than silently ignored.
    pub fn validate(&self) -> Result<(), BrokerError> {
        let invalid = |reason: &str| BrokerError::InvalidTopic {
            topic: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("topic name must not be empty"));
        }
        if self.partitions == 0 {
            return Err(invalid("partitions must be at least 1"));
        }
        if self.partitions > 1 {
            return Err(invalid("only single-partition topics are supported"));
        }
        if self.replication == 0 {
            return Err(invalid("replication must be at least 1"));
        }
        Ok(())
    }

    /// Subject the topic's messages are published on.
    pub fn subject(&self) -> &str {
        &self.name
    }

    /// Stream name derived from the topic name.
    pub fn stream_name(&self) -> String {
        stream_name_for(&self.name)
    }
}

/// Map a topic name onto a valid JetStream stream name.
///
/// Stream names may not contain `.`, `*`, `>`, whitespace or path separators.
/// Each of those is written as `-` followed by its UTF-8 bytes in hex, and so
/// is `-` itself, which keeps distinct topics on distinct streams.
pub fn stream_name_for(topic: &str) -> String {
    let mut name = String::with_capacity(topic.len());
    for c in topic.chars() {
        let reserved = matches!(c, '.' | '*' | '>' | '/' | '\\' | '-') || c.is_whitespace();
        if reserved {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                name.push_str(&format!("-{byte:02X}"));
            }
        } else {
            name.push(c);
        }
    }
    name
}

/// Idempotent topic administration.
#[async_trait]
pub trait TopicManager: Send + Sync {
    /// Make sure the topic exists.
    ///
    /// Succeeds when the topic already exists, including when another caller
    /// created it concurrently.
    async fn ensure_topic(&self, spec: &TopicSpec) -> Result<(), BrokerError>;

    /// Check that the broker is reachable.
    async fn ping(&self) -> Result<(), BrokerError>;
}
