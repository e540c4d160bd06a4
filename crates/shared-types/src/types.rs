use std::fmt;

/// Severity shared by policy rules and the violations they produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PolicyRule {
    pub category: String,
    pub severity: Severity,
    pub keywords: Vec<String>, // Matched as lowercase substrings, in this order
    pub description: String,
}

impl PolicyRule {
    pub fn new(category: &str, severity: Severity, keywords: &[&str], description: &str) -> Self {
        Self {
            category: category.to_string(),
            severity,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Metafield {
    pub namespace: String,
    pub key: String,
    pub value: String,
}

/// A storefront product as returned by the admin catalog
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String, // e.g., "gid://shopify/Product/1"
    pub title: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub online_store_url: Option<String>,
    #[serde(default)]
    pub metafields: Vec<Metafield>,
}

impl Product {
    /// Public URL of the product, falling back to the shop's handle route
    pub fn url(&self, shop_domain: &str) -> String {
        match &self.online_store_url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => format!("https://{}/products/{}", shop_domain, self.handle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceViolation {
    pub issue: String,
    pub policy: String,
    pub law: String,
    pub severity: Severity,
    pub risk_score: f64, // Always within [0, 1]
    pub suggestion: String,
    pub why_matters: String,
    pub rule_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl ComplianceViolation {
    /// Key used to collapse duplicate findings of the same underlying issue
    pub fn dedupe_key(&self) -> String {
        format!("{}|{}|{}", self.issue, self.policy, self.law)
    }
}

/// Suggested replacement copy returned by the AI stage
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProductRewrite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProductRewrite {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Flagged,
    Clean,
    Error,
}

/// One product's result within a scan
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceFinding {
    pub product_id: String,
    pub product_title: String,
    pub market: String,
    pub violations: Vec<ComplianceViolation>,
    pub compliance_score: u8,
    pub status: FindingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<ProductRewrite>,
}
