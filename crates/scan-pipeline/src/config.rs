//! Pipeline configuration
//!
//! Read from the process environment; every variable is optional.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::analyzer::{AiAnalyzer, AnalyzerSettings, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::catalog::DEFAULT_PAGE_SIZE;
use crate::completion::CompletionClient;
use crate::error::CatalogError;
use crate::openai::{OpenAiClient, OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::shopify::{ShopifyAdminClient, ShopifyConfig, DEFAULT_API_VERSION};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Absent means heuristics only
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub ai_timeout_secs: u64,
    pub shopify_api_version: String,
    /// Replaces `https://{shop}` for admin calls (proxies, tests)
    pub shopify_base_url: Option<String>,
    pub page_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BASE_DELAY_MS,
            ai_timeout_secs: DEFAULT_TIMEOUT_SECS,
            shopify_api_version: DEFAULT_API_VERSION.to_string(),
            shopify_base_url: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = move |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            openai_api_key: lookup("OPENAI_API_KEY").map(|key| key.trim().to_string()),
            openai_base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            model: lookup("OPENAI_MODEL").unwrap_or(defaults.model),
            temperature: parsed(&lookup, "AI_TEMPERATURE", defaults.temperature)?,
            max_attempts: parsed(&lookup, "AI_MAX_ATTEMPTS", defaults.max_attempts)?,
            backoff_ms: parsed(&lookup, "AI_BACKOFF_MS", defaults.backoff_ms)?,
            ai_timeout_secs: parsed(&lookup, "AI_TIMEOUT_SECS", defaults.ai_timeout_secs)?,
            shopify_api_version: lookup("SHOPIFY_API_VERSION")
                .unwrap_or(defaults.shopify_api_version),
            shopify_base_url: lookup("SHOPIFY_ADMIN_BASE_URL"),
            page_size: parsed(&lookup, "PRODUCT_PAGE_SIZE", defaults.page_size)?,
        };

        if config.max_attempts == 0 {
            return Err(anyhow!("AI_MAX_ATTEMPTS must be at least 1"));
        }
        if config.page_size == 0 || config.page_size > 250 {
            return Err(anyhow!("PRODUCT_PAGE_SIZE must be between 1 and 250"));
        }

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn analyzer_settings(&self) -> AnalyzerSettings {
        AnalyzerSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            retry: self.retry_policy(),
        }
    }

    /// Analyzer with an OpenAI client when a key is configured
    pub fn build_analyzer(&self) -> Result<AiAnalyzer> {
        let client = match &self.openai_api_key {
            Some(key) => {
                let config = OpenAiConfig {
                    base_url: self.openai_base_url.clone(),
                    api_key: key.clone(),
                    timeout_secs: self.ai_timeout_secs,
                };
                let client = OpenAiClient::new(config).context("building completion client")?;
                Some(Arc::new(client) as Arc<dyn CompletionClient>)
            }
            None => {
                tracing::info!("OPENAI_API_KEY not set; scans will use heuristics only");
                None
            }
        };
        Ok(AiAnalyzer::new(client, self.analyzer_settings()))
    }

    pub fn shopify_client(
        &self,
        shop_domain: &str,
        access_token: &str,
    ) -> Result<ShopifyAdminClient, CatalogError> {
        let mut config =
            ShopifyConfig::new(shop_domain, access_token).with_api_version(&self.shopify_api_version);
        if let Some(base_url) = &self.shopify_base_url {
            config = config.with_base_url(base_url);
        }
        ShopifyAdminClient::new(config)
    }
}
