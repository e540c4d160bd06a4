//! Scan pipeline: catalog fetch, AI analysis and scan orchestration
//!
//! External services sit behind [`AdminGraphql`] and [`CompletionClient`];
//! persistence sits behind [`ScanStore`]. Everything is injected through
//! [`ScanOrchestrator::new`].

pub mod analyzer;
pub mod catalog;
pub mod completion;
pub mod config;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod retry;
pub mod shopify;
pub mod store;

pub use analyzer::{AiAnalyzer, AiOutcome, AnalyzerSettings, AI_FAILURE_MESSAGE};
pub use catalog::{fetch_all_products, fetch_product_by_id, AdminGraphql, DEFAULT_PAGE_SIZE};
pub use completion::{ChatMessage, CompletionClient, CompletionRequest};
pub use config::PipelineConfig;
pub use error::{CatalogError, CompletionError, PipelineError, StoreError};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use orchestrator::ScanOrchestrator;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use shopify::{ShopifyAdminClient, ShopifyConfig};
pub use store::{MemoryScanStore, ScanStore};
