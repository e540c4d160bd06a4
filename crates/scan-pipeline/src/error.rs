//! Error types for the scan pipeline

use thiserror::Error;

/// Failures talking to the admin GraphQL API
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error calling admin API: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Admin API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("Unexpected catalog response: {0}")]
    Decode(String),

    #[error("Client configuration error: {0}")]
    Config(String),
}

/// Failures of a single LLM completion attempt
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error calling completion API: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Completion response had no message content")]
    EmptyResponse,

    #[error("Client configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Whole-operation failures surfaced to the caller
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No products found to scan.")]
    NoProducts,

    #[error("Scan not found")]
    ScanNotFound,

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
