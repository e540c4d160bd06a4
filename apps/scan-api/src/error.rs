//! Error types for the scan API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scan_pipeline::{CatalogError, PipelineError, StoreError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing X-Shopify-Access-Token header")]
    MissingToken,

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Config(msg) => ApiError::InvalidRequest(msg),
            other => ApiError::Pipeline(PipelineError::Catalog(other)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            ApiError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "MISSING_TOKEN",
                self.to_string(),
            ),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            ApiError::Pipeline(err) => match err {
                PipelineError::NoProducts => {
                    (StatusCode::BAD_REQUEST, "NO_PRODUCTS", err.to_string())
                }
                PipelineError::ScanNotFound => {
                    (StatusCode::NOT_FOUND, "SCAN_NOT_FOUND", err.to_string())
                }
                PipelineError::ProductNotFound(_) => {
                    (StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND", err.to_string())
                }
                PipelineError::Catalog(e) => {
                    tracing::warn!("Catalog error: {}", e);
                    (StatusCode::BAD_GATEWAY, "CATALOG_ERROR", err.to_string())
                }
                PipelineError::Store(e) => {
                    tracing::error!("Store error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "STORE_ERROR",
                        "Storage error".to_string(),
                    )
                }
            },
            ApiError::Store(e) => {
                tracing::error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "Storage error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
