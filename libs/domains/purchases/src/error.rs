//! Purchase domain error types

use crate::models::{QueryErrorResponse, StatusErrorResponse};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use messaging::BrokerError;
use thiserror::Error;

/// Result type for purchase operations
pub type Result<T> = std::result::Result<T, PurchaseError>;

/// Message returned to clients when the broker topic cannot be prepared
pub const TOPIC_FAILURE_MESSAGE: &str = "Failed to send purchase request to broker";

#[derive(Debug, Error)]
pub enum PurchaseError {
    /// The store could not be reached or did not answer
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store refused this particular document; retrying will not help
    #[error("Store rejected purchase: {0}")]
    Rejected(String),

    /// The broker topic could not be ensured
    #[error("Topic unavailable: {0}")]
    Topic(#[source] BrokerError),

    /// Request body was not a JSON object
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    /// Event could not be converted for storage
    #[error("Invalid purchase event: {0}")]
    InvalidEvent(String),
}

impl PurchaseError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<mongodb::error::Error> for PurchaseError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for PurchaseError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        Self::InvalidEvent(format!("BSON serialization error: {}", err))
    }
}

impl IntoResponse for PurchaseError {
    fn into_response(self) -> Response {
        match self {
            Self::StoreUnavailable(message) | Self::Rejected(message) => {
                tracing::error!(error = %message, "Store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(QueryErrorResponse { error: message }),
                )
                    .into_response()
            }
            Self::Topic(err) => {
                tracing::error!(error = %err, "Failed to ensure broker topic");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(StatusErrorResponse::new(
                        TOPIC_FAILURE_MESSAGE,
                        Some(err.to_string()),
                    )),
                )
                    .into_response()
            }
            Self::InvalidBody(rejection) => AppError::from(rejection).into_response(),
            Self::InvalidEvent(message) => AppError::BadRequest(message).into_response(),
        }
    }
}

/// Reasons the persistence worker stops on its own
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// The purchase could not be stored; retries, if any, are exhausted
    #[error("Failed to persist purchase {timestamp}: {source}")]
    Persist {
        timestamp: String,
        #[source]
        source: PurchaseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_store_error_body() {
        let response = PurchaseError::StoreUnavailable("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({"error": "connection refused"}));
    }

    #[tokio::test]
    async fn test_topic_error_body() {
        let err = PurchaseError::Topic(BrokerError::Connect("no servers".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], TOPIC_FAILURE_MESSAGE);
        assert!(body["error"].as_str().unwrap().contains("no servers"));
    }

    #[test]
    fn test_only_store_errors_are_transient() {
        assert!(PurchaseError::StoreUnavailable("x".into()).is_transient());
        assert!(!PurchaseError::InvalidEvent("x".into()).is_transient());
        assert!(!PurchaseError::Rejected("x".into()).is_transient());
    }
}
