use axum_helpers::server::{ShutdownCoordinator, create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_purchases::{
    MongoPurchaseRepository, PersistenceWorker, PurchaseRepository, PurchaseService,
};
use messaging::nats::JetStreamBroker;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info};

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

    let client = database::mongodb::connect_from_config_with_retry(&config.mongo, None)
        .await
        .map_err(|e| eyre::eyre!("MongoDB connection failed: {}", e))?;
    let db = client.database(config.mongo.database());

    let repository = MongoPurchaseRepository::new(&db, &config.store.collection);
    repository
        .ensure_indexes()
        .await
        .map_err(|e| eyre::eyre!("Failed to create purchase indexes: {}", e))?;
    info!(collection = %config.store.collection, "Purchase store ready");

    let (coordinator, _rx) = ShutdownCoordinator::new();

    // The worker shares the server's shutdown. If it dies on its own the
    // whole process stops so the supervisor restarts it.
    let worker = PersistenceWorker::new(
        JetStreamBroker::new(config.nats.clone()),
        repository.clone(),
        config.topic.spec(),
    )
    .with_retry(config.worker.retry_policy());
    let worker_failed = Arc::new(AtomicBool::new(false));
    let worker_handle = {
        let shutdown = coordinator.subscribe();
        let coordinator = coordinator.clone();
        let worker_failed = worker_failed.clone();
        tokio::spawn(async move {
            if let Err(e) = worker.run(shutdown).await {
                error!(error = %e, "Persistence worker stopped, shutting down");
                worker_failed.store(true, Ordering::SeqCst);
                coordinator.shutdown();
            }
        })
    };

    let state = AppState {
        config,
        purchases: Arc::new(PurchaseService::new(repository)),
    };

    let api_routes = api::routes(&state);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes, &state.config.server)?;

    // - /health: liveness with app name/version
    // - /ready: MongoDB ping
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    info!(topic = %state.config.topic.name, "Starting purchases API");

    create_production_app(
        app,
        &state.config.server,
        coordinator,
        Duration::from_secs(30),
        async move {
            info!("Shutting down: waiting for the persistence worker");
            if let Err(e) = worker_handle.await {
                error!(error = %e, "Persistence worker task panicked");
            }
            // MongoDB client closes on drop
            drop(client);
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    if worker_failed.load(Ordering::SeqCst) {
        return Err(eyre::eyre!("Persistence worker failed; restart required"));
    }

    info!("Purchases API shutdown complete");
    Ok(())
}
