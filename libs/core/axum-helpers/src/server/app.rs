use super::shutdown::ShutdownCoordinator;
use crate::errors::handlers::{method_not_allowed, not_found};
use crate::http::cors_layer_for;
use axum::{Json, Router, routing::get};
use core_config::server::ServerConfig;
use std::io;
use std::time::Duration;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;

/// Wraps domain routes with the cross-cutting layers every service gets.
///
/// - `apis` nested under `/api`
/// - OpenAPI document of `T` at `/api-docs/openapi.json`
/// - request tracing
/// - CORS from `server_config.allowed_origins` (permissive when empty)
/// - JSON 404 and 405 fallbacks
///
/// Health endpoints are merged by the caller with `health_router()` and its
/// own readiness handler.
///
/// # Errors
/// Returns `InvalidInput` if a configured CORS origin is malformed.
///
/// # Example
/// ```ignore
/// let api_routes = Router::new()
///     .merge(purchases_router(service));
///
/// let router = create_router::<ApiDoc>(api_routes, &config.server)?
///     .merge(health_router(app_info!()));
/// ```
pub fn create_router<T>(apis: Router, server_config: &ServerConfig) -> io::Result<Router>
where
    T: OpenApi + 'static,
{
    let cors_layer = cors_layer_for(&server_config.allowed_origins)?;
    let openapi = T::openapi();

    let router = Router::new()
        .route(
            "/api-docs/openapi.json",
            get(move || {
                let openapi = openapi.clone();
                async move { Json(openapi) }
            }),
        )
        .nest("/api", apis)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer);

    Ok(router)
}

/// Server with coordinated shutdown and cleanup.
///
/// The server stops when `coordinator` starts shutting down, whether from a
/// signal or from a background task calling
/// [`ShutdownCoordinator::shutdown`]. `cleanup` then runs with
/// `shutdown_timeout` as its upper bound.
///
/// # Example
/// ```ignore
/// let (coordinator, _) = ShutdownCoordinator::new();
/// let worker = tokio::spawn(worker.run(coordinator.subscribe()));
///
/// create_production_app(router, &config, coordinator, Duration::from_secs(30), async move {
///     worker.await.ok();
/// })
/// .await?;
/// ```
pub async fn create_production_app<F>(
    router: Router,
    server_config: &ServerConfig,
    coordinator: ShutdownCoordinator,
    shutdown_timeout: Duration,
    cleanup: F,
) -> io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let shutdown_handle = coordinator.clone();
    let cleanup_handle = tokio::spawn(async move {
        shutdown_handle.wait().await;

        info!("Starting cleanup tasks (timeout: {:?})", shutdown_timeout);
        match tokio::time::timeout(shutdown_timeout, cleanup).await {
            Ok(_) => info!("Cleanup completed successfully"),
            Err(_) => {
                tracing::warn!(
                    "Cleanup exceeded timeout of {:?}, forcing shutdown",
                    shutdown_timeout
                );
            }
        }
    });

    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { coordinator.wait().await })
        .await
        .inspect_err(|e| {
            tracing::error!("Server encountered an error: {:?}", e);
        });

    cleanup_handle.await.ok();

    serve_result
}
