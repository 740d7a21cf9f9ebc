//! Shared application state.

use domain_purchases::{IngestionService, PurchasesApiClient};
use messaging::nats::JetStreamBroker;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub ingestion: Arc<IngestionService<JetStreamBroker>>,
    pub api_client: PurchasesApiClient,
}
