use mongodb::{Client, options::ClientOptions};
use tracing::{info, instrument};

use super::{MongoConfig, ping};
use crate::common::{DatabaseError, RetryConfig, retry_with_backoff};

/// Build a client from `config` and make sure the server answers.
#[instrument(skip(config), fields(database = %config.database))]
pub async fn connect_from_config(config: &MongoConfig) -> Result<Client, DatabaseError> {
    let mut options = ClientOptions::parse(&config.url).await?;
    options.app_name = config.app_name.clone();
    options.max_pool_size = Some(config.max_pool_size);
    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.server_selection_timeout);

    let client = Client::with_options(options)?;
    let latency = ping(&client.database(&config.database))
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!(latency_ms = latency.as_millis() as u64, "Connected to MongoDB");
    Ok(client)
}

/// [`connect_from_config`] retried while the server comes up.
///
/// `None` falls back to [`MongoConfig::startup_retry`].
pub async fn connect_from_config_with_retry(
    config: &MongoConfig,
    policy: Option<RetryConfig>,
) -> Result<Client, DatabaseError> {
    let policy = policy.unwrap_or_else(|| config.startup_retry());
    retry_with_backoff(|| connect_from_config(config), policy).await
}
