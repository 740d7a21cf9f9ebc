use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Install the color-eyre panic and report hooks.
///
/// Call first thing in `main()`. Repeated calls are no-ops.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for log shipping
    Json,
    /// Multi-line human readable output
    Pretty,
}

impl LogFormat {
    /// `LOG_FORMAT=json|pretty` wins; otherwise production logs JSON.
    pub fn from_env(environment: &Environment) -> Self {
        match std::env::var("LOG_FORMAT").ok().as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(f) if f.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ if environment.is_production() => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn default_directives(environment: &Environment) -> &'static str {
    if environment.is_production() {
        "info,tower_http=info,mongodb=warn,async_nats=warn"
    } else {
        "debug,tower_http=debug,mongodb=info,async_nats=info,hyper=info,reqwest=info"
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` replaces the default filter. `tracing_error::ErrorLayer` is
/// always installed so eyre reports carry span traces. Calls after the
/// first are ignored.
pub fn init_tracing(environment: &Environment) {
    let format = LogFormat::from_env(environment);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(environment)));

    let output = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .flatten_event(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .pretty()
            .boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(output)
        .with(tracing_error::ErrorLayer::default())
        .with(filter)
        .try_init();

    if installed.is_ok() {
        info!(environment = ?environment, format = ?format, "Tracing initialized");
    } else {
        debug!("Tracing already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_follows_environment() {
        temp_env::with_var_unset("LOG_FORMAT", || {
            assert_eq!(LogFormat::from_env(&Environment::Production), LogFormat::Json);
            assert_eq!(LogFormat::from_env(&Environment::Development), LogFormat::Pretty);
        });
    }

    #[test]
    fn test_log_format_override() {
        temp_env::with_var("LOG_FORMAT", Some("JSON"), || {
            assert_eq!(LogFormat::from_env(&Environment::Development), LogFormat::Json);
        });
        temp_env::with_var("LOG_FORMAT", Some("pretty"), || {
            assert_eq!(LogFormat::from_env(&Environment::Production), LogFormat::Pretty);
        });
        temp_env::with_var("LOG_FORMAT", Some("xml"), || {
            assert_eq!(LogFormat::from_env(&Environment::Development), LogFormat::Pretty);
        });
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(&Environment::Development);
        init_tracing(&Environment::Production);
    }
}
