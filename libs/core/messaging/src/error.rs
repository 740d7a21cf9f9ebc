//! Error types for broker operations.

use thiserror::Error;

/// Error that can occur while talking to the message broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Could not establish a connection to the broker
    #[error("Broker connection error: {0}")]
    Connect(String),

    /// Topic parameters the broker cannot honour
    #[error("Invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: String },

    /// Topic creation failed for a reason other than "already exists"
    #[error("Failed to create topic '{topic}': {reason}")]
    TopicCreate { topic: String, reason: String },

    /// Topic does not exist (subscribe before ensure)
    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    /// Consumer creation or message retrieval failed
    #[error("Consumer error: {0}")]
    Consumer(String),

    /// Acknowledgment could not be delivered to the broker
    #[error("Acknowledgment error: {0}")]
    Ack(String),

    /// Message payload could not be decoded
    #[error("Malformed message at sequence {sequence}: {reason}")]
    MalformedMessage { sequence: u64, reason: String },

    /// The subscription ended (connection closed, consumer deleted)
    #[error("Subscription closed for topic '{0}'")]
    SubscriptionClosed(String),
}

impl BrokerError {
    /// Create a consumer error.
    pub fn consumer_error(msg: impl std::fmt::Display) -> Self {
        Self::Consumer(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_sequence() {
        let err = BrokerError::MalformedMessage {
            sequence: 42,
            reason: "expected value".into(),
        };
        assert!(err.to_string().contains("42"));
    }
}
