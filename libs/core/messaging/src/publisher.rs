//! Publishing seam.

use async_trait::async_trait;
use serde::Serialize;

/// Result of a publish attempt.
///
/// Publishing never fails loudly: a message the broker did not confirm is
/// reported as [`PublishOutcome::Dropped`] and the caller decides whether
/// that matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The broker confirmed the write at the given sequence.
    Acknowledged { sequence: u64 },
    /// The message was not confirmed.
    Dropped { reason: String },
}

impl PublishOutcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Self::Acknowledged { .. })
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Serialize `event` as JSON and send it to `topic`.
    async fn publish<T>(&self, topic: &str, event: &T) -> PublishOutcome
    where
        T: Serialize + Send + Sync;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        assert!(PublishOutcome::Acknowledged { sequence: 1 }.is_acknowledged());
        assert!(!PublishOutcome::Dropped {
            reason: "ack timeout".into()
        }
        .is_acknowledged());
    }
}
