//! LLM stage of the product scan
//!
//! The analyzer never fails a scan. A missing client means heuristics only;
//! exhausted retries produce an empty outcome carrying a user-facing error
//! message; unparseable content is treated as "nothing found".

use std::sync::Arc;

use compliance_engine::markets::{law_focus, market_key};
use compliance_engine::normalize_violation;
use compliance_engine::patterns::{plain_text, truncate_chars};
use compliance_engine::rules::MAX_HINTS;
use serde_json::Value;
use shared_types::{ComplianceViolation, Product, ProductRewrite};

use crate::completion::{ChatMessage, CompletionClient, CompletionRequest};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Description characters sent to the model
pub const MAX_DESCRIPTION_CHARS: usize = 3500;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Stored on the finding when every attempt failed
pub use compliance_engine::normalize::AI_FAILURE_MESSAGE;

const SYSTEM_PROMPT: &str = "You are an advertising compliance reviewer for e-commerce \
product listings. Respond with a single JSON object and nothing else.";

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSettings {
    pub model: String,
    pub temperature: f32,
    pub retry: RetryPolicy,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            retry: RetryPolicy::default(),
        }
    }
}

/// Result of the AI stage for one product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiOutcome {
    pub violations: Vec<ComplianceViolation>,
    pub rewrite: Option<ProductRewrite>,
    pub error_message: Option<String>,
}

pub struct AiAnalyzer {
    client: Option<Arc<dyn CompletionClient>>,
    settings: AnalyzerSettings,
}

impl AiAnalyzer {
    pub fn new(client: Option<Arc<dyn CompletionClient>>, settings: AnalyzerSettings) -> Self {
        Self { client, settings }
    }

    /// Heuristics-only analyzer
    pub fn disabled() -> Self {
        Self::new(None, AnalyzerSettings::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub async fn analyze(
        &self,
        product: &Product,
        market: &str,
        shop_domain: &str,
        hints: &[String],
    ) -> AiOutcome {
        let Some(client) = self.client.as_ref() else {
            tracing::debug!(product_id = %product.id, "no completion client configured, skipping AI stage");
            return AiOutcome::default();
        };

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(build_prompt(product, market, shop_domain, hints)),
            ],
            json_response: true,
        };

        let result = retry_with_backoff(&self.settings.retry, "AI analysis", |attempt| {
            let client = Arc::clone(client);
            let request = request.clone();
            let product_id = product.id.clone();
            async move {
                tracing::debug!(%product_id, attempt = attempt + 1, "requesting completion");
                client.complete(request).await
            }
        })
        .await;

        match result {
            Ok(content) => {
                let outcome = parse_response(&content, market);
                tracing::info!(
                    product_id = %product.id,
                    violations = outcome.violations.len(),
                    rewrite = outcome.rewrite.is_some(),
                    "AI analysis complete"
                );
                outcome
            }
            Err(e) => {
                tracing::error!(product_id = %product.id, "AI analysis failed: {e}");
                AiOutcome {
                    error_message: Some(AI_FAILURE_MESSAGE.to_string()),
                    ..Default::default()
                }
            }
        }
    }
}

/// User prompt for one product
pub fn build_prompt(product: &Product, market: &str, shop_domain: &str, hints: &[String]) -> String {
    let market = market_key(market);
    let description = truncate_chars(&plain_text(&product.description), MAX_DESCRIPTION_CHARS);

    let hint_block = if hints.is_empty() {
        "none".to_string()
    } else {
        hints
            .iter()
            .take(MAX_HINTS)
            .map(|hint| format!("- {hint}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Review this product listing for advertising policy and consumer law problems.\n\
         \n\
         Market: {market}\n\
         Focus: {focus}\n\
         \n\
         Title: {title}\n\
         URL: {url}\n\
         Description:\n{description}\n\
         \n\
         Keyword pre-scan hints:\n{hint_block}\n\
         \n\
         Return JSON shaped as:\n\
         {{\"violations\": [{{\"issue\": string, \"policy\": string, \"law\": string, \
         \"severity\": \"high\"|\"medium\"|\"low\", \"riskScore\": number 0-1, \
         \"suggestion\": string, \"whyMatters\": string, \"ruleRef\": string, \
         \"sourceUrl\": string}}], \
         \"rewrite\": {{\"title\": string, \"description\": string, \"notes\": string}}}}\n\
         Use an empty violations array when the listing is compliant.",
        focus = law_focus(&market),
        title = product.title,
        url = product.url(shop_domain),
    )
}

/// Lenient decode of model output
pub fn parse_response(content: &str, market: &str) -> AiOutcome {
    let parsed: Value = match serde_json::from_str(content.trim()) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("AI response was not valid JSON: {e}");
            return AiOutcome::default();
        }
    };

    let violations = parsed
        .get("violations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| normalize_violation(item, market))
                .collect()
        })
        .unwrap_or_default();

    let rewrite = parsed
        .get("rewrite")
        .filter(|value| value.is_object())
        .map(parse_rewrite)
        .filter(|rewrite| !rewrite.is_empty());

    AiOutcome {
        violations,
        rewrite,
        error_message: None,
    }
}

fn parse_rewrite(value: &Value) -> ProductRewrite {
    let field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    ProductRewrite {
        title: field("title"),
        description: field("description"),
        notes: field("notes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use shared_types::Severity;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FailingClient {
        calls: AtomicU32,
    }

    #[async_trait]
    impl CompletionClient for FailingClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CompletionError::Status {
                status: 500,
                body: "upstream".to_string(),
            })
        }
    }

    struct CannedClient {
        content: String,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
            self.requests.lock().unwrap().push(request);
            Ok(self.content.clone())
        }
    }

    fn product() -> Product {
        Product {
            id: "gid://shopify/Product/1".to_string(),
            title: "Herbal Tea".to_string(),
            handle: "herbal-tea".to_string(),
            description: "<p>Relaxing blend</p>".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_absent_client_returns_empty_outcome() {
        let outcome = AiAnalyzer::disabled()
            .analyze(&product(), "us", "shop.example", &[])
            .await;
        assert_eq!(outcome, AiOutcome::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_failure() {
        let client = Arc::new(FailingClient {
            calls: AtomicU32::new(0),
        });
        let analyzer = AiAnalyzer::new(Some(client.clone()), AnalyzerSettings::default());
        let started = tokio::time::Instant::now();

        let outcome = analyzer.analyze(&product(), "us", "shop.example", &[]).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
        assert!(outcome.violations.is_empty());
        assert_eq!(outcome.error_message.as_deref(), Some(AI_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn test_request_carries_model_and_json_mode() {
        let client = Arc::new(CannedClient {
            content: r#"{"violations": []}"#.to_string(),
            requests: Mutex::new(Vec::new()),
        });
        let settings = AnalyzerSettings {
            model: "test-model".to_string(),
            temperature: 0.0,
            retry: RetryPolicy::default(),
        };
        let analyzer = AiAnalyzer::new(Some(client.clone()), settings);

        let outcome = analyzer
            .analyze(&product(), "uk", "shop.example", &["Medical Claims (High): cure".to_string()])
            .await;
        assert_eq!(outcome, AiOutcome::default());

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "test-model");
        assert!(requests[0].json_response);
        assert_eq!(requests[0].messages[0].role, "system");
        assert!(requests[0].messages[1].content.contains("Medical Claims (High): cure"));
    }

    #[test]
    fn test_prompt_contents() {
        let mut product = product();
        product.description = format!("<b>{}</b>", "x".repeat(5000));
        let hints: Vec<String> = (0..10).map(|i| format!("hint {i}")).collect();

        let prompt = build_prompt(&product, " US ", "shop.example", &hints);

        assert!(prompt.contains("Market: us"));
        assert!(prompt.contains(law_focus("us")));
        assert!(prompt.contains("Title: Herbal Tea"));
        assert!(prompt.contains("URL: https://shop.example/products/herbal-tea"));
        assert!(prompt.contains(&"x".repeat(MAX_DESCRIPTION_CHARS)));
        assert!(!prompt.contains(&"x".repeat(MAX_DESCRIPTION_CHARS + 1)));
        assert!(!prompt.contains("<b>"));
        assert!(prompt.contains("- hint 5"));
        assert!(!prompt.contains("- hint 6"));
    }

    #[test]
    fn test_parse_invalid_json_is_empty_without_error() {
        assert_eq!(parse_response("not json at all", "us"), AiOutcome::default());
    }

    #[test]
    fn test_parse_violations_not_array() {
        let outcome = parse_response(r#"{"violations": "none"}"#, "us");
        assert!(outcome.violations.is_empty());
        assert!(outcome.error_message.is_none());
    }

    #[test]
    fn test_parse_drops_blank_issues_and_normalizes() {
        let content = r#"{
            "violations": [
                {"issue": "Claims to cure insomnia", "severity": "HIGH", "policy": "Health claims"},
                {"issue": "   ", "severity": "low"},
                {"severity": "low"},
                {"issue": "Unclear pricing", "risk_score": 1.7, "why_matters": "Ads rejected"}
            ],
            "rewrite": {"title": "Calming Herbal Tea", "description": "", "notes": null}
        }"#;

        let outcome = parse_response(content, "us");

        assert_eq!(outcome.violations.len(), 2);
        assert_eq!(outcome.violations[0].severity, Severity::High);
        assert_eq!(outcome.violations[0].risk_score, 0.92);
        assert_eq!(outcome.violations[1].severity, Severity::Medium);
        assert_eq!(outcome.violations[1].risk_score, 1.0);
        assert_eq!(outcome.violations[1].why_matters, "Ads rejected");
        assert_eq!(
            outcome.rewrite,
            Some(ProductRewrite {
                title: Some("Calming Herbal Tea".to_string()),
                description: None,
                notes: None,
            })
        );
    }

    #[test]
    fn test_parse_empty_rewrite_is_dropped() {
        let outcome = parse_response(r#"{"violations": [], "rewrite": {}}"#, "us");
        assert!(outcome.rewrite.is_none());
        let outcome = parse_response(r#"{"violations": [], "rewrite": "text"}"#, "us");
        assert!(outcome.rewrite.is_none());
    }
}
