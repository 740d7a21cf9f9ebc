use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use database::mongodb::MongoConfig;
use domain_purchases::{StoreConfig, TopicConfig, WorkerConfig};
use messaging::nats::NatsConfig;

pub use core_config::Environment;

/// Port used when `PORT` is not set
pub const DEFAULT_PORT: u16 = 5000;

/// Query service and persistence worker configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub mongo: MongoConfig,
    pub store: StoreConfig,
    pub nats: NatsConfig,
    pub topic: TopicConfig,
    pub worker: WorkerConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let app = app_info!();
        let environment = Environment::from_env();
        let server = ServerConfig::from_env_with_port(DEFAULT_PORT)?;
        let mongo = MongoConfig::from_env()?.with_app_name(app.name);
        let store = StoreConfig::from_env()?;
        let nats = NatsConfig::from_env()?.with_client_name(app.name);
        let topic = TopicConfig::from_env()?;
        let worker = WorkerConfig::from_env()?;

        Ok(Self {
            app,
            environment,
            server,
            mongo,
            store,
            nats,
            topic,
            worker,
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
                ("MONGODB_URL", Some("mongodb://localhost:27017")),
                ("MONGODB_DATABASE", Some("shop")),
                ("NATS_URL", Some("nats://localhost:4222")),
                ("PURCHASES_TOPIC", Some("purchases")),
                ("PORT", None),
                ("MONGODB_PURCHASES_COLLECTION", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.server.port, DEFAULT_PORT);
                assert_eq!(config.store.collection, "purchases");
                assert_eq!(config.topic.spec().name, "purchases");
                assert_eq!(config.nats.client_name, "purchases_api");
            },
        );
    }

    #[test]
    fn test_config_requires_topic() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", Some("mongodb://localhost:27017")),
                ("MONGODB_DATABASE", Some("shop")),
                ("NATS_URL", Some("nats://localhost:4222")),
                ("PURCHASES_TOPIC", None),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }
}
