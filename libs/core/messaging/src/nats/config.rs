//! Configuration for the NATS JetStream backend.

use core_config::{env_or_default, env_parse_or, env_required, ConfigError, FromEnv};
use std::time::Duration;

/// Durable consumer name used when `BROKER_CONSUMER_NAME` is not set.
pub const DEFAULT_CONSUMER_NAME: &str = "purchases-persistence";

/// Connection settings for NATS.
#[derive(Clone)]
pub struct NatsConfig {
    /// Server URLs, tried in order
    pub servers: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upper bound for establishing a connection
    pub connect_timeout: Duration,
    /// Upper bound for waiting on a publish acknowledgment
    pub publish_timeout: Duration,
    /// Durable consumer name used by subscriptions
    pub consumer_name: String,
    /// Name reported to the server for this client
    pub client_name: String,
}

impl NatsConfig {
    pub fn new(servers: Vec<String>) -> Self {
        Self {
            servers,
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(5),
            publish_timeout: Duration::from_millis(5000),
            consumer_name: DEFAULT_CONSUMER_NAME.to_string(),
            client_name: "purchases".to_string(),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Server list in the comma-separated form the client accepts.
    pub fn server_list(&self) -> String {
        self.servers.join(",")
    }
}

impl std::fmt::Debug for NatsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsConfig")
            .field("servers", &self.servers)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connect_timeout", &self.connect_timeout)
            .field("publish_timeout", &self.publish_timeout)
            .field("consumer_name", &self.consumer_name)
            .field("client_name", &self.client_name)
            .finish()
    }
}

impl FromEnv for NatsConfig {
    /// Reads:
    /// - NATS_URL (required, comma-separated)
    /// - NATS_USERNAME / NATS_PASSWORD (optional, both or neither)
    /// - NATS_CONNECT_TIMEOUT_SECS (default 5)
    /// - BROKER_PUBLISH_TIMEOUT_MS (default 5000)
    /// - BROKER_CONSUMER_NAME (default `purchases-persistence`)
    fn from_env() -> Result<Self, ConfigError> {
        let servers: Vec<String> = env_required("NATS_URL")?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if servers.is_empty() {
            return Err(ConfigError::Invalid("NATS_URL lists no servers".to_string()));
        }

        let username = std::env::var("NATS_USERNAME").ok().filter(|s| !s.is_empty());
        let password = std::env::var("NATS_PASSWORD").ok().filter(|s| !s.is_empty());
        if username.is_some() != password.is_some() {
            return Err(ConfigError::Invalid(
                "NATS_USERNAME and NATS_PASSWORD must be set together".to_string(),
            ));
        }

        let connect_timeout =
            Duration::from_secs(env_parse_or("NATS_CONNECT_TIMEOUT_SECS", 5u64)?);
        let publish_timeout =
            Duration::from_millis(env_parse_or("BROKER_PUBLISH_TIMEOUT_MS", 5000u64)?);
        let consumer_name = env_or_default("BROKER_CONSUMER_NAME", DEFAULT_CONSUMER_NAME);

        Ok(Self {
            servers,
            username,
            password,
            connect_timeout,
            publish_timeout,
            consumer_name,
            client_name: "purchases".to_string(),
        })
    }
}
