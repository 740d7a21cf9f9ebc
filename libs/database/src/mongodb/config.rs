use crate::common::RetryConfig;
use std::time::Duration;

#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_parse_or};

/// MongoDB connection settings.
///
/// ```ignore
/// use database::mongodb::MongoConfig;
///
/// let config = MongoConfig::with_database("mongodb://localhost:27017", "shop")
///     .with_app_name("purchases_api");
/// ```
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// `mongodb://[username:password@]host[:port][/database][?options]`
    pub url: String,
    pub database: String,
    /// Reported in server logs and `currentOp`
    pub app_name: Option<String>,
    pub max_pool_size: u32,
    pub connect_timeout: Duration,
    /// How long an operation waits for a usable server before failing
    pub server_selection_timeout: Duration,
    /// Ping attempts made at startup before giving up
    pub connect_retries: u32,
}

impl MongoConfig {
    pub fn with_database(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Default::default()
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Backoff used while waiting for the server at startup.
    pub fn startup_retry(&self) -> RetryConfig {
        RetryConfig::new()
            .with_max_retries(self.connect_retries)
            .with_initial_delay(Duration::from_millis(500))
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: "purchases".to_string(),
            app_name: None,
            max_pool_size: 50,
            connect_timeout: Duration::from_secs(10),
            server_selection_timeout: Duration::from_secs(5),
            connect_retries: 5,
        }
    }
}

/// Environment:
///
/// - `MONGODB_URL` (required)
/// - `MONGODB_DATABASE` (required)
/// - `MONGODB_MAX_POOL_SIZE` (default 50)
/// - `MONGODB_CONNECT_TIMEOUT_SECS` (default 10)
/// - `MONGODB_SERVER_SELECTION_TIMEOUT_SECS` (default 5)
/// - `MONGODB_CONNECT_RETRIES` (default 5)
#[cfg(feature = "config")]
impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = core_config::env_required("MONGODB_URL")?;
        let database = core_config::env_required("MONGODB_DATABASE")?;
        if database.trim().is_empty() {
            return Err(ConfigError::Invalid("MONGODB_DATABASE is empty".to_string()));
        }

        let defaults = Self::default();
        let secs = |key: &str, default: Duration| -> Result<Duration, ConfigError> {
            env_parse_or(key, default.as_secs()).map(Duration::from_secs)
        };

        Ok(Self {
            url,
            database,
            app_name: None,
            max_pool_size: env_parse_or("MONGODB_MAX_POOL_SIZE", defaults.max_pool_size)?,
            connect_timeout: secs("MONGODB_CONNECT_TIMEOUT_SECS", defaults.connect_timeout)?,
            server_selection_timeout: secs(
                "MONGODB_SERVER_SELECTION_TIMEOUT_SECS",
                defaults.server_selection_timeout,
            )?,
            connect_retries: env_parse_or("MONGODB_CONNECT_RETRIES", defaults.connect_retries)?,
        })
    }
}
