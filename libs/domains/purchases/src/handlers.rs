//! HTTP handlers for the purchase endpoints

use crate::client::{ProxyError, PurchasesApiClient};
use crate::error::PurchaseError;
use crate::ingestion::IngestionService;
use crate::models::{IngestResponse, QueryErrorResponse, StatusErrorResponse, StoredPurchase};
use crate::repository::PurchaseRepository;
use crate::service::PurchaseService;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use messaging::{EventPublisher, TopicManager};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;

/// Query router state
pub type PurchasesState<R> = Arc<PurchaseService<R>>;

/// Ingestion router state
pub type IngestionState<B> = Arc<IngestionService<B>>;

/// `GET /purchases/`, with and without the trailing slash
pub fn purchases_router<R: PurchaseRepository + 'static>(state: PurchasesState<R>) -> Router {
    Router::new()
        .route("/purchases/", get(list_purchases::<R>))
        .route("/purchases", get(list_purchases::<R>))
        .with_state(state)
}

/// `POST /buy/`, with and without the trailing slash
pub fn ingestion_router<B>(state: IngestionState<B>) -> Router
where
    B: TopicManager + EventPublisher + 'static,
{
    Router::new()
        .route("/buy/", post(buy::<B>))
        .route("/buy", post(buy::<B>))
        .with_state(state)
}

/// `GET /getAllUserBuys/`, with and without the trailing slash
pub fn proxy_router(client: PurchasesApiClient) -> Router {
    Router::new()
        .route("/getAllUserBuys/", get(get_all_user_buys))
        .route("/getAllUserBuys", get(get_all_user_buys))
        .with_state(client)
}

/// List every stored purchase
#[utoipa::path(
    get,
    path = "/purchases/",
    responses(
        (status = 200, description = "Stored purchases", body = Vec<StoredPurchase>),
        (status = 500, description = "Store error", body = QueryErrorResponse)
    ),
    tag = "purchases"
)]
#[instrument(skip(state))]
pub async fn list_purchases<R: PurchaseRepository>(
    State(state): State<PurchasesState<R>>,
) -> Result<Json<Vec<StoredPurchase>>, PurchaseError> {
    let purchases = state.list_all().await?;
    Ok(Json(purchases))
}

/// Submit a purchase
///
/// The body is any JSON object. The server assigns `timestamp`; a client
/// value for it is replaced.
#[utoipa::path(
    post,
    path = "/buy/",
    request_body(content = Value, description = "Free-form purchase fields, must be a JSON object"),
    responses(
        (status = 200, description = "Purchase handed to the broker", body = IngestResponse),
        (status = 415, description = "Missing JSON content type"),
        (status = 422, description = "Body is not a JSON object"),
        (status = 500, description = "Broker topic unavailable", body = StatusErrorResponse)
    ),
    tag = "purchases"
)]
#[instrument(skip(state, body))]
pub async fn buy<B>(
    State(state): State<IngestionState<B>>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, PurchaseError>
where
    B: TopicManager + EventPublisher,
{
    let Json(payload) = body?;
    let (event, _outcome) = state.ingest(payload).await?;
    Ok(Json(IngestResponse::accepted(event)))
}

/// All stored purchases, read through the api service
#[utoipa::path(
    get,
    path = "/getAllUserBuys/",
    responses(
        (
            status = 200,
            description = "Stored purchases as returned by the api service",
            body = Vec<StoredPurchase>
        ),
        (status = 502, description = "Api service unreachable", body = StatusErrorResponse),
        (
            status = "5XX",
            description = "Api service error status, passed through",
            body = StatusErrorResponse
        )
    ),
    tag = "purchases"
)]
#[instrument(skip(client))]
pub async fn get_all_user_buys(
    State(client): State<PurchasesApiClient>,
) -> Result<Json<Value>, ProxyError> {
    let purchases = client.list_purchases().await?;
    Ok(Json(purchases))
}
