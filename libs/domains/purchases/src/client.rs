//! HTTP client for the purchases api, used by the gateway proxy.

use crate::models::StatusErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{instrument, warn};

/// Message returned to clients when the upstream listing fails
pub const PROXY_FAILURE_MESSAGE: &str = "Failed to retrieve user purchases";

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Upstream answered with a non-200 status
    #[error("Upstream responded with {0}")]
    UpstreamStatus(StatusCode),

    /// Upstream could not be reached
    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    /// Upstream answered 200 with a body that is not JSON
    #[error("Upstream returned an invalid body: {0}")]
    InvalidBody(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UpstreamStatus(status) => *status,
            Self::Unreachable(_) | Self::InvalidBody(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        warn!(error = %self, "Proxy request failed");
        (
            self.status_code(),
            Json(StatusErrorResponse::new(PROXY_FAILURE_MESSAGE, None)),
        )
            .into_response()
    }
}

/// Reads stored purchases from the api service.
#[derive(Clone)]
pub struct PurchasesApiClient {
    http: reqwest::Client,
    list_url: String,
}

impl PurchasesApiClient {
    /// `base_url` is the api root, e.g. `http://purchases-api:5000`.
    pub fn new(base_url: &str) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProxyError::Unreachable(e.to_string()))?;

        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            list_url: format!("{}/api/purchases/", base_url.trim_end_matches('/')),
        }
    }

    pub fn list_url(&self) -> &str {
        &self.list_url
    }

    /// Upstream listing, passed through unchanged.
    #[instrument(skip(self), fields(url = %self.list_url))]
    pub async fn list_purchases(&self) -> Result<Value, ProxyError> {
        let response = self
            .http
            .get(&self.list_url)
            .send()
            .await
            .map_err(|e| ProxyError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ProxyError::UpstreamStatus(status));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProxyError::InvalidBody(e.to_string()))
    }
}
