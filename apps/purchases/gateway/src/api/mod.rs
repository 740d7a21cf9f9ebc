use crate::state::AppState;
use axum::Router;

pub mod health;

/// API routes without the `/api` prefix; `create_router` adds it.
pub fn routes(state: &AppState) -> Router {
    domain_purchases::ingestion_router(state.ingestion.clone())
        .merge(domain_purchases::proxy_router(state.api_client.clone()))
}

/// `/ready`, checking the broker.
pub fn ready_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
