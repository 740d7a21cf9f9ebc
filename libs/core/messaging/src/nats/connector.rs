use super::config::NatsConfig;
use crate::error::BrokerError;
use async_nats::{Client, ConnectOptions};
use tracing::{debug, instrument};

/// Open a NATS connection using the configured servers and credentials.
///
/// The connection closes when the returned client and all of its clones are
/// dropped.
#[instrument(skip(config), fields(servers = %config.server_list()))]
pub async fn connect(config: &NatsConfig) -> Result<Client, BrokerError> {
    let mut options = ConnectOptions::new()
        .name(config.client_name.clone())
        .connection_timeout(config.connect_timeout);

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options = options.user_and_password(username.clone(), password.clone());
    }

    let client = options
        .connect(config.server_list())
        .await
        .map_err(|e| BrokerError::Connect(e.to_string()))?;

    debug!("Connected to NATS");
    Ok(client)
}
