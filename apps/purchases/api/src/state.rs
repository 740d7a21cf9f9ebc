//! Shared application state.

use domain_purchases::{MongoPurchaseRepository, PurchaseService};
use std::sync::Arc;

/// Handles shared by the HTTP handlers.
///
/// The persistence worker gets its own clones at startup and is not part of
/// the state.
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub purchases: Arc<PurchaseService<MongoPurchaseRepository>>,
}
