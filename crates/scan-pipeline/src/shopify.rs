//! reqwest adapter for the Shopify Admin GraphQL API
//!
//! One client per shop. The access token is supplied by the caller and sent
//! as `X-Shopify-Access-Token` on every request. No retries happen here.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::catalog::AdminGraphql;
use crate::error::CatalogError;

pub const DEFAULT_API_VERSION: &str = "2024-10";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ACCESS_TOKEN_HEADER: &str = "x-shopify-access-token";

#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// `my-shop.myshopify.com`
    pub shop_domain: String,
    pub access_token: String,
    pub api_version: String,
    pub timeout_secs: u64,
    /// Replaces `https://{shop_domain}`; used by tests
    pub base_url: Option<String>,
}

impl ShopifyConfig {
    pub fn new(shop_domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            shop_domain: shop_domain.into(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: None,
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn endpoint(&self) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.shop_domain));
        format!(
            "{}/admin/api/{}/graphql.json",
            base.trim_end_matches('/'),
            self.api_version
        )
    }
}

#[derive(Debug)]
pub struct ShopifyAdminClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    #[serde(default)]
    message: String,
}

impl ShopifyAdminClient {
    pub fn new(config: ShopifyConfig) -> Result<Self, CatalogError> {
        if config.access_token.trim().is_empty() {
            return Err(CatalogError::Config("missing access token".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::HeaderName::from_static(ACCESS_TOKEN_HEADER),
                    reqwest::header::HeaderValue::from_str(&config.access_token)
                        .map_err(|_| CatalogError::Config("invalid access token characters".into()))?,
                );
                headers.insert(
                    reqwest::header::CONTENT_TYPE,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .map_err(|e| CatalogError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
        })
    }
}

#[async_trait]
impl AdminGraphql for ShopifyAdminClient {
    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, CatalogError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "admin API request failed");
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphqlEnvelope = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(format!("GraphQL envelope: {e}")))?;

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            let message = errors
                .into_iter()
                .map(|entry| entry.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CatalogError::Graphql(message));
        }

        envelope
            .data
            .filter(|data| !data.is_null())
            .ok_or_else(|| CatalogError::Decode("GraphQL response had no data".into()))
    }
}
