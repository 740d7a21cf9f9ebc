//! Purchases Domain
//!
//! Purchases are accepted over HTTP, queued on a broker topic and stored
//! exactly once, keyed by their server-assigned timestamp.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Purchase Flow                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  POST /buy/ ─► IngestionService ─► ensure topic ─► publish    │
//! │                                                       │       │
//! │                                                       ▼       │
//! │                                                 broker topic  │
//! │                                                       │       │
//! │                    PersistenceWorker ◄────────────────┘       │
//! │                          │ insert-if-absent, then ack         │
//! │                          ▼                                    │
//! │  GET /purchases/ ◄── PurchaseRepository (unique timestamp)    │
//! │        ▲                                                      │
//! │        └──── GET /getAllUserBuys/ (PurchasesApiClient)        │
//! │                                                               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use utoipa::OpenApi;

mod client;
mod clock;
mod config;
mod error;
mod handlers;
mod ingestion;
mod memory;
mod models;
mod mongodb;
mod repository;
mod service;
mod worker;

pub use crate::mongodb::{MongoPurchaseRepository, TIMESTAMP_INDEX};
pub use client::{PROXY_FAILURE_MESSAGE, ProxyError, PurchasesApiClient};
pub use clock::{Clock, DEFAULT_UTC_OFFSET_HOURS, FixedClock, SystemClock};
pub use config::{DEFAULT_COLLECTION, GatewayConfig, StoreConfig, TopicConfig, WorkerConfig};
pub use error::{PurchaseError, Result, TOPIC_FAILURE_MESSAGE, WorkerError};
pub use handlers::{
    IngestionState, PurchasesState, ingestion_router, proxy_router, purchases_router,
};
pub use ingestion::IngestionService;
pub use memory::InMemoryPurchaseRepository;
pub use models::{
    IngestResponse, PurchaseEvent, PurchaseTimestamp, QueryErrorResponse, StatusErrorResponse,
    StoredPurchase,
};
pub use repository::{InsertOutcome, PurchaseRepository};
pub use service::PurchaseService;
pub use worker::PersistenceWorker;

/// OpenAPI documentation for the query side
#[derive(OpenApi)]
#[openapi(
    paths(handlers::list_purchases),
    components(schemas(StoredPurchase, QueryErrorResponse)),
    tags(
        (name = "purchases", description = "Stored purchases")
    )
)]
pub struct ApiDoc;

/// OpenAPI documentation for the gateway
#[derive(OpenApi)]
#[openapi(
    paths(handlers::buy, handlers::get_all_user_buys),
    components(schemas(
        PurchaseEvent,
        PurchaseTimestamp,
        IngestResponse,
        StatusErrorResponse,
        StoredPurchase,
    )),
    tags(
        (name = "purchases", description = "Purchase ingestion and listing")
    )
)]
pub struct GatewayApiDoc;
