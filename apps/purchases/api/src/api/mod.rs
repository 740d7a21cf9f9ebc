use crate::state::AppState;
use axum::Router;

pub mod health;

/// API routes without the `/api` prefix; `create_router` adds it.
pub fn routes(state: &AppState) -> Router {
    domain_purchases::purchases_router(state.purchases.clone())
}

/// `/ready`, checking MongoDB.
pub fn ready_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
