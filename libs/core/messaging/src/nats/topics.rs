use super::JetStreamBroker;
use crate::error::BrokerError;
use crate::topic::{TopicManager, TopicSpec};
use async_nats::jetstream::stream::Config as StreamConfig;
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

#[async_trait]
impl TopicManager for JetStreamBroker {
    #[instrument(skip(self, spec), fields(topic = %spec.name))]
    async fn ensure_topic(&self, spec: &TopicSpec) -> Result<(), BrokerError> {
        spec.validate()?;

        let stream_name = spec.stream_name();
        let jetstream = self.context().await?;

        if let Ok(stream) = jetstream.get_stream(&stream_name).await {
            debug!(stream = %stream_name, "Stream already exists");
            return check_subjects(spec, &stream.cached_info().config.subjects);
        }

        info!(
            stream = %stream_name,
            subject = %spec.subject(),
            replicas = spec.replication,
            "Creating stream"
        );

        let created = jetstream
            .create_stream(StreamConfig {
                name: stream_name.clone(),
                subjects: vec![spec.subject().to_string()],
                num_replicas: spec.replication as usize,
                ..Default::default()
            })
            .await;

        match created {
            Ok(_) => {
                info!(stream = %stream_name, "Stream created");
                Ok(())
            }
            Err(create_err) => {
                // Another instance may have created it between probe and create.
                if let Ok(stream) = jetstream.get_stream(&stream_name).await {
                    debug!(stream = %stream_name, "Stream created concurrently");
                    return check_subjects(spec, &stream.cached_info().config.subjects);
                }
                warn!(stream = %stream_name, error = %create_err, "Stream creation failed");
                Err(BrokerError::TopicCreate {
                    topic: spec.name.clone(),
                    reason: create_err.to_string(),
                })
            }
        }
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        let client = super::connect(&self.config).await?;
        client
            .flush()
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))
    }
}

/// An existing stream only serves the topic if it captures the topic's subject.
fn check_subjects(spec: &TopicSpec, subjects: &[String]) -> Result<(), BrokerError> {
    if subjects.iter().any(|s| s == spec.subject()) {
        return Ok(());
    }
    warn!(topic = %spec.name, ?subjects, "Stream exists with different subjects");
    Err(BrokerError::TopicCreate {
        topic: spec.name.clone(),
        reason: format!(
            "stream {} exists with subjects {:?}",
            spec.stream_name(),
            subjects
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_with_topic_subject_is_accepted() {
        let spec = TopicSpec::new("shop.purchases");
        let subjects = vec!["shop.refunds".to_string(), "shop.purchases".to_string()];
        assert!(check_subjects(&spec, &subjects).is_ok());
    }

    #[test]
    fn test_stream_with_other_subjects_is_rejected() {
        let spec = TopicSpec::new("shop.purchases");
        let err = check_subjects(&spec, &["shop_purchases".to_string()]).unwrap_err();
        match err {
            BrokerError::TopicCreate { topic, reason } => {
                assert_eq!(topic, "shop.purchases");
                assert!(reason.contains("shop_purchases"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
