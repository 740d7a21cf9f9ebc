use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use domain_purchases::{GatewayConfig, TopicConfig};
use messaging::nats::NatsConfig;

pub use core_config::Environment;

/// Port used when `PORT` is not set
pub const DEFAULT_PORT: u16 = 8080;

/// Gateway configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub nats: NatsConfig,
    pub topic: TopicConfig,
    pub gateway: GatewayConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let app = app_info!();
        let environment = Environment::from_env();
        let server = ServerConfig::from_env_with_port(DEFAULT_PORT)?;
        let nats = NatsConfig::from_env()?.with_client_name(app.name);
        let topic = TopicConfig::from_env()?;
        let gateway = GatewayConfig::from_env()?;

        Ok(Self {
            app,
            environment,
            server,
            nats,
            topic,
            gateway,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("NATS_URL", Some("nats://localhost:4222")),
                ("PURCHASES_TOPIC", Some("purchases")),
                ("PURCHASES_API_URL", Some("http://api:5000")),
                ("PORT", None),
                ("PURCHASE_UTC_OFFSET_HOURS", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.server.port, DEFAULT_PORT);
                assert_eq!(config.gateway.api_url, "http://api:5000");
                assert_eq!(config.gateway.utc_offset_hours, 3);
                assert_eq!(config.nats.client_name, "purchases_gateway");
            },
        );
    }

    #[test]
    fn test_config_requires_api_url() {
        temp_env::with_vars(
            [
                ("NATS_URL", Some("nats://localhost:4222")),
                ("PURCHASES_TOPIC", Some("purchases")),
                ("PURCHASES_API_URL", None),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }
}
