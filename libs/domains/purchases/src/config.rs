//! Environment configuration for the purchase pipeline.

use crate::clock::{DEFAULT_UTC_OFFSET_HOURS, offset_from_hours};
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or, env_required};
use database::common::RetryConfig;
use messaging::TopicSpec;
use std::time::Duration;

/// Collection used when `MONGODB_PURCHASES_COLLECTION` is not set.
pub const DEFAULT_COLLECTION: &str = "purchases";

/// Broker topic carrying purchase events.
///
/// - PURCHASES_TOPIC: required
/// - PURCHASES_TOPIC_REPLICAS: defaults to 1
#[derive(Debug, Clone)]
pub struct TopicConfig {
    pub name: String,
    pub replicas: u32,
}

impl TopicConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replicas: 1,
        }
    }

    /// Single-partition topic description.
    pub fn spec(&self) -> TopicSpec {
        TopicSpec::new(&self.name).with_replication(self.replicas)
    }
}

impl FromEnv for TopicConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let name = env_required("PURCHASES_TOPIC")?;
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "PURCHASES_TOPIC must not be empty".to_string(),
            ));
        }

        Ok(Self {
            name,
            replicas: env_parse_or("PURCHASES_TOPIC_REPLICAS", 1)?,
        })
    }
}

/// Where purchases are stored.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl FromEnv for StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            collection: env_or_default("MONGODB_PURCHASES_COLLECTION", DEFAULT_COLLECTION),
        })
    }
}

/// Store retry policy of the persistence worker.
///
/// - WORKER_STORE_MAX_RETRIES: defaults to 5
/// - WORKER_STORE_RETRY_DELAY_MS: defaults to 200
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl WorkerConfig {
    pub fn retry_policy(&self) -> RetryConfig {
        RetryConfig::new()
            .with_max_retries(self.max_retries)
            .with_initial_delay(Duration::from_millis(self.retry_delay_ms))
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_ms: 200,
        }
    }
}

impl FromEnv for WorkerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_retries: env_parse_or("WORKER_STORE_MAX_RETRIES", defaults.max_retries)?,
            retry_delay_ms: env_parse_or("WORKER_STORE_RETRY_DELAY_MS", defaults.retry_delay_ms)?,
        })
    }
}

/// Gateway-side settings.
///
/// - PURCHASES_API_URL: required, base URL of the api service
/// - PURCHASE_UTC_OFFSET_HOURS: defaults to 3, must lie within -23..=23
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_url: String,
    pub utc_offset_hours: i32,
}

impl FromEnv for GatewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let utc_offset_hours =
            env_parse_or("PURCHASE_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;
        if offset_from_hours(utc_offset_hours).is_none() {
            return Err(ConfigError::Invalid(format!(
                "PURCHASE_UTC_OFFSET_HOURS must be between -23 and 23, got {utc_offset_hours}"
            )));
        }

        Ok(Self {
            api_url: env_required("PURCHASES_API_URL")?,
            utc_offset_hours,
        })
    }
}
