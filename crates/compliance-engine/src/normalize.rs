//! Canonicalization of violation records
//!
//! Violations reach the engine in three shapes:
//! - fresh AI output with free-form severity strings
//! - legacy stored findings carrying only `issues: string[]`
//! - structured findings from an earlier scan being reloaded
//!
//! Stored shapes are decoded into [`StoredFinding`] and migrated once at the
//! persistence boundary. Everything downstream sees [`ComplianceViolation`].

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use shared_types::{ComplianceFinding, ComplianceViolation, ProductRewrite, Severity};

use crate::markets::{law_reference, market_key};
use crate::patterns::slugify;
use crate::scoring::build_finding;

/// Policy label used when a record does not name one
pub const DEFAULT_POLICY: &str = "Google Ads policy";

/// Risk assigned to violations migrated from legacy issue strings
pub const DEFAULT_RISK: f64 = 0.6;

/// Error shown on findings whose AI stage failed
pub const AI_FAILURE_MESSAGE: &str = "AI scan failed. Please retry.";

/// Case-insensitive severity mapping; anything unrecognized is `Medium`
pub fn normalize_severity(raw: &str) -> Severity {
    match raw.trim().to_lowercase().as_str() {
        "high" => Severity::High,
        "low" => Severity::Low,
        _ => Severity::Medium,
    }
}

/// Fixed severity-to-risk table for heuristically derived scores
pub fn severity_risk(severity: Severity) -> f64 {
    match severity {
        Severity::High => 0.92,
        Severity::Medium => 0.6,
        Severity::Low => 0.3,
    }
}

/// Clamp into [0, 1]; NaN becomes the Medium default
pub fn clamp_risk(risk: f64) -> f64 {
    if risk.is_nan() {
        return 0.5;
    }
    risk.clamp(0.0, 1.0)
}

fn text_field(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn number_field(raw: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find_map(Value::as_f64)
}

/// Coerce one raw violation object into the canonical record.
///
/// Returns `None` when the record has no usable `issue`.
pub fn normalize_violation(raw: &Value, market: &str) -> Option<ComplianceViolation> {
    let issue = text_field(raw, &["issue"])?;
    let reference = law_reference(market);

    let severity = text_field(raw, &["severity"])
        .map(|s| normalize_severity(&s))
        .unwrap_or(Severity::Medium);
    let risk_score = clamp_risk(
        number_field(raw, &["riskScore", "risk_score"]).unwrap_or_else(|| severity_risk(severity)),
    );
    let policy = text_field(raw, &["policy"]).unwrap_or_else(|| DEFAULT_POLICY.to_string());
    let rule_ref = text_field(raw, &["ruleRef", "rule_ref"]).unwrap_or_else(|| slugify(&policy));

    Some(ComplianceViolation {
        issue,
        law: text_field(raw, &["law"]).unwrap_or_else(|| reference.law.to_string()),
        severity,
        risk_score,
        suggestion: text_field(raw, &["suggestion"]).unwrap_or_default(),
        why_matters: text_field(raw, &["whyMatters", "why_matters"]).unwrap_or_default(),
        rule_ref,
        source_url: text_field(raw, &["sourceUrl", "source_url"])
            .or_else(|| Some(reference.source_url.to_string())),
        policy,
    })
}

/// Violation for a bare issue string from a legacy record
pub fn legacy_violation(issue: &str, market: &str) -> Option<ComplianceViolation> {
    let issue = issue.trim();
    if issue.is_empty() {
        return None;
    }
    let reference = law_reference(market);
    Some(ComplianceViolation {
        issue: issue.to_string(),
        policy: DEFAULT_POLICY.to_string(),
        law: reference.law.to_string(),
        severity: Severity::Medium,
        risk_score: DEFAULT_RISK,
        suggestion: String::new(),
        why_matters: String::new(),
        rule_ref: slugify(DEFAULT_POLICY),
        source_url: Some(reference.source_url.to_string()),
    })
}

/// Drop later violations whose `issue|policy|law` key was already seen
pub fn dedupe_violations(violations: Vec<ComplianceViolation>) -> Vec<ComplianceViolation> {
    let mut seen = HashSet::new();
    violations
        .into_iter()
        .filter(|violation| seen.insert(violation.dedupe_key()))
        .collect()
}

/// Current stored finding shape
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredFinding {
    #[serde(alias = "product_id")]
    pub product_id: String,
    #[serde(default, alias = "product_title")]
    pub product_title: String,
    #[serde(default)]
    pub market: Option<String>,
    pub violations: Vec<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "error_message")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub rewrite: Option<ProductRewrite>,
}

/// Older stored shape: flat issue strings, no structured violation data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFinding {
    #[serde(alias = "product_id")]
    pub product_id: String,
    #[serde(default, alias = "product_title", alias = "title")]
    pub product_title: String,
    #[serde(default)]
    pub market: Option<String>,
    pub issues: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A finding as read back from storage, in any supported version
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredFinding {
    Structured(StructuredFinding),
    Legacy(LegacyFinding),
}

impl StoredFinding {
    /// Convert into the canonical finding, re-normalizing and rescoring
    pub fn migrate(self, default_market: &str) -> ComplianceFinding {
        match self {
            StoredFinding::Structured(record) => {
                let market = resolve_market(record.market.as_deref(), default_market);
                let violations = dedupe_violations(
                    record
                        .violations
                        .iter()
                        .filter_map(|raw| normalize_violation(raw, &market))
                        .collect(),
                );
                let error_message = match record.status.as_deref() {
                    Some("error") => record
                        .error_message
                        .or_else(|| Some(AI_FAILURE_MESSAGE.to_string())),
                    _ => None,
                };
                build_finding(
                    &record.product_id,
                    &record.product_title,
                    &market,
                    violations,
                    error_message,
                    record.rewrite.filter(|rewrite| !rewrite.is_empty()),
                )
            }
            StoredFinding::Legacy(record) => {
                let market = resolve_market(record.market.as_deref(), default_market);
                let violations = dedupe_violations(
                    record
                        .issues
                        .iter()
                        .filter_map(|issue| legacy_violation(issue, &market))
                        .collect(),
                );
                let error_message = match record.status.as_deref() {
                    Some("error") => Some(AI_FAILURE_MESSAGE.to_string()),
                    _ => None,
                };
                build_finding(
                    &record.product_id,
                    &record.product_title,
                    &market,
                    violations,
                    error_message,
                    None,
                )
            }
        }
    }
}

fn resolve_market(stored: Option<&str>, fallback: &str) -> String {
    match stored {
        Some(market) if !market.trim().is_empty() => market_key(market),
        _ => market_key(fallback),
    }
}

/// Decode and migrate a stored results array.
///
/// Entries that match no known shape are skipped with a warning; a payload
/// that is not an array yields no findings.
pub fn migrate_results(results: &Value, default_market: &str) -> Vec<ComplianceFinding> {
    let Some(entries) = results.as_array() else {
        tracing::warn!("stored scan results are not an array; ignoring");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match StoredFinding::deserialize(entry) {
            Ok(stored) => Some(stored.migrate(default_market)),
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable stored finding");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shared_types::FindingStatus;

    #[test]
    fn test_severity_normalization() {
        assert_eq!(normalize_severity("HIGH"), Severity::High);
        assert_eq!(normalize_severity(" low "), Severity::Low);
        assert_eq!(normalize_severity("critical"), Severity::Medium);
        assert_eq!(normalize_severity(""), Severity::Medium);
    }

    #[test]
    fn test_clamp_risk_edges() {
        assert_eq!(clamp_risk(f64::NAN), 0.5);
        assert_eq!(clamp_risk(-3.0), 0.0);
        assert_eq!(clamp_risk(7.5), 1.0);
        assert_eq!(clamp_risk(0.42), 0.42);
    }

    #[test]
    fn test_normalize_ai_violation_with_reported_risk() {
        let raw = json!({
            "issue": "Claims the serum cures eczema",
            "policy": "Healthcare and medicines",
            "severity": "HIGH",
            "riskScore": 1.7,
            "suggestion": "Describe the texture instead",
            "whyMatters": "Medical claims get disapproved",
        });
        let v = normalize_violation(&raw, "us").unwrap();
        assert_eq!(v.severity, Severity::High);
        assert_eq!(v.risk_score, 1.0);
        assert_eq!(v.law, law_reference("us").law);
        assert_eq!(v.rule_ref, "healthcare-and-medicines");
        assert_eq!(v.why_matters, "Medical claims get disapproved");
    }

    #[test]
    fn test_normalize_derives_risk_from_severity() {
        let raw = json!({ "issue": "Vague eco claim", "severity": "low", "riskScore": "0.9" });
        let v = normalize_violation(&raw, "eu").unwrap();
        assert_eq!(v.risk_score, 0.3);
        assert_eq!(v.policy, DEFAULT_POLICY);
        assert_eq!(v.source_url.as_deref(), Some(law_reference("eu").source_url));
    }

    #[test]
    fn test_normalize_accepts_snake_case_keys() {
        let raw = json!({
            "issue": "x",
            "risk_score": 0.25,
            "why_matters": "y",
            "rule_ref": "custom-ref",
            "source_url": "https://example.com/rule",
        });
        let v = normalize_violation(&raw, "default").unwrap();
        assert_eq!(v.risk_score, 0.25);
        assert_eq!(v.why_matters, "y");
        assert_eq!(v.rule_ref, "custom-ref");
        assert_eq!(v.source_url.as_deref(), Some("https://example.com/rule"));
    }

    #[test]
    fn test_missing_issue_is_dropped() {
        assert!(normalize_violation(&json!({ "policy": "x" }), "us").is_none());
        assert!(normalize_violation(&json!({ "issue": "   " }), "us").is_none());
        assert!(normalize_violation(&json!("just a string"), "us").is_none());
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let a = normalize_violation(&json!({ "issue": "a", "suggestion": "first" }), "us").unwrap();
        let b = normalize_violation(&json!({ "issue": "b" }), "us").unwrap();
        let a_again =
            normalize_violation(&json!({ "issue": "a", "suggestion": "second" }), "us").unwrap();

        let deduped = dedupe_violations(vec![a, b, a_again]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].issue, "a");
        assert_eq!(deduped[0].suggestion, "first");
        assert_eq!(deduped[1].issue, "b");
    }

    #[test]
    fn test_migrates_legacy_issue_strings() {
        let stored = json!([{
            "productId": "gid://shopify/Product/9",
            "productTitle": "Detox Tea",
            "issues": ["Weight loss claim", "", "Weight loss claim"],
        }]);
        let findings = migrate_results(&stored, "uk");
        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.market, "uk");
        assert_eq!(finding.violations.len(), 1);
        assert_eq!(finding.violations[0].risk_score, DEFAULT_RISK);
        assert_eq!(finding.status, FindingStatus::Flagged);
        // 100 - 0.6 * 35 = 79
        assert_eq!(finding.compliance_score, 79);
    }

    #[test]
    fn test_legacy_error_record_carries_failure_message() {
        let stored = json!([{ "productId": "p", "issues": ["x"], "status": "error" }]);
        let findings = migrate_results(&stored, "us");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, FindingStatus::Error);
        assert_eq!(findings[0].error_message.as_deref(), Some(AI_FAILURE_MESSAGE));
        assert_eq!(findings[0].violations.len(), 1);
    }

    #[test]
    fn test_migrates_structured_finding_and_keeps_error() {
        let stored = json!([{
            "productId": "p1",
            "productTitle": "Serum",
            "market": "US",
            "violations": [{ "issue": "Cure claim", "severity": "High", "riskScore": 0.92 }],
            "complianceScore": 12,
            "status": "error",
            "errorMessage": "AI scan failed. Please retry."
        }]);
        let findings = migrate_results(&stored, "default");
        let finding = &findings[0];
        assert_eq!(finding.market, "us");
        assert_eq!(finding.status, FindingStatus::Error);
        assert_eq!(finding.compliance_score, 68);
        assert_eq!(
            finding.error_message.as_deref(),
            Some("AI scan failed. Please retry.")
        );
    }

    #[test]
    fn test_migrate_skips_unknown_shapes() {
        let stored = json!([{ "productId": "p1" }, 42, { "productId": "p2", "violations": [] }]);
        let findings = migrate_results(&stored, "us");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].product_id, "p2");
        assert_eq!(findings[0].status, FindingStatus::Clean);
        assert!(migrate_results(&json!({ "not": "an array" }), "us").is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn severity_is_case_insensitive(s in "[a-zA-Z]{0,8}") {
                let lower = normalize_severity(&s.to_lowercase());
                let upper = normalize_severity(&s.to_uppercase());
                prop_assert_eq!(lower, upper);
                let expected = match s.to_lowercase().as_str() {
                    "high" => Severity::High,
                    "low" => Severity::Low,
                    _ => Severity::Medium,
                };
                prop_assert_eq!(normalize_severity(&s), expected);
            }

            #[test]
            fn clamped_risk_is_in_unit_interval(r in proptest::num::f64::ANY) {
                let clamped = clamp_risk(r);
                prop_assert!((0.0..=1.0).contains(&clamped));
                if r.is_nan() {
                    prop_assert_eq!(clamped, 0.5);
                }
            }

            #[test]
            fn dedupe_has_unique_keys_and_preserves_order(
                issues in proptest::collection::vec("[a-d]", 0..20),
            ) {
                let violations: Vec<_> = issues
                    .iter()
                    .filter_map(|i| normalize_violation(&json!({ "issue": i }), "us"))
                    .collect();
                let deduped = dedupe_violations(violations);

                let mut first_seen: Vec<&String> = Vec::new();
                for issue in &issues {
                    if !first_seen.contains(&issue) {
                        first_seen.push(issue);
                    }
                }
                let got: Vec<&String> = deduped.iter().map(|v| &v.issue).collect();
                prop_assert_eq!(got, first_seen);
            }
        }
    }
}
