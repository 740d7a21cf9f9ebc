use axum_helpers::server::{ShutdownCoordinator, create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_purchases::{IngestionService, PurchasesApiClient, SystemClock};
use messaging::nats::JetStreamBroker;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);

    let clock = SystemClock::with_offset_hours(config.gateway.utc_offset_hours)
        .ok_or_else(|| eyre::eyre!("Invalid UTC offset: {}h", config.gateway.utc_offset_hours))?;
    let broker = JetStreamBroker::new(config.nats.clone());
    let ingestion =
        IngestionService::new(broker, config.topic.spec()).with_clock(Arc::new(clock));
    let api_client = PurchasesApiClient::new(&config.gateway.api_url)
        .map_err(|e| eyre::eyre!("Failed to build purchases API client: {}", e))?;
    info!(upstream = %api_client.list_url(), "Proxying purchase listing");

    let state = AppState {
        config,
        ingestion: Arc::new(ingestion),
        api_client,
    };

    let api_routes = api::routes(&state);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes, &state.config.server)?;

    // - /health: liveness with app name/version
    // - /ready: broker connection
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    info!(topic = %state.config.topic.name, "Starting purchases gateway");

    let (coordinator, _rx) = ShutdownCoordinator::new();
    create_production_app(
        app,
        &state.config.server,
        coordinator,
        Duration::from_secs(30),
        async {
            info!("Gateway has no background tasks to drain");
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Purchases gateway shutdown complete");
    Ok(())
}
