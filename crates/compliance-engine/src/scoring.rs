//! Per-product compliance scoring

use shared_types::{ComplianceFinding, ComplianceViolation, FindingStatus, ProductRewrite};

use crate::normalize::clamp_risk;

/// Points deducted per unit of risk
pub const RISK_WEIGHT: f64 = 35.0;

/// `100 - Σ(risk × 35)`, rounded and clamped to 0..=100
pub fn compliance_score(violations: &[ComplianceViolation]) -> u8 {
    let penalty: f64 = violations
        .iter()
        .map(|v| clamp_risk(v.risk_score) * RISK_WEIGHT)
        .sum();
    (100.0 - penalty).round().clamp(0.0, 100.0) as u8
}

/// `error` wins; otherwise `clean` iff there are no violations
pub fn finding_status(violations: &[ComplianceViolation], failed: bool) -> FindingStatus {
    if failed {
        FindingStatus::Error
    } else if violations.is_empty() {
        FindingStatus::Clean
    } else {
        FindingStatus::Flagged
    }
}

/// Assemble a finding with its score and status derived from `violations`
pub fn build_finding(
    product_id: &str,
    product_title: &str,
    market: &str,
    violations: Vec<ComplianceViolation>,
    error_message: Option<String>,
    rewrite: Option<ProductRewrite>,
) -> ComplianceFinding {
    ComplianceFinding {
        product_id: product_id.to_string(),
        product_title: product_title.to_string(),
        market: market.to_string(),
        compliance_score: compliance_score(&violations),
        status: finding_status(&violations, error_message.is_some()),
        violations,
        error_message,
        rewrite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Severity;

    fn violation(risk: f64) -> ComplianceViolation {
        ComplianceViolation {
            issue: format!("issue {}", risk),
            policy: "p".to_string(),
            law: "l".to_string(),
            severity: Severity::Medium,
            risk_score: risk,
            suggestion: String::new(),
            why_matters: String::new(),
            rule_ref: "p".to_string(),
            source_url: None,
        }
    }

    #[test]
    fn test_clean_product_scores_100() {
        assert_eq!(compliance_score(&[]), 100);
        assert_eq!(finding_status(&[], false), FindingStatus::Clean);
    }

    #[test]
    fn test_score_formula() {
        // 100 - (0.92 + 0.3) * 35 = 57.3
        assert_eq!(compliance_score(&[violation(0.92), violation(0.3)]), 57);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let many: Vec<_> = (0..5).map(|_| violation(1.0)).collect();
        assert_eq!(compliance_score(&many), 0);
    }

    #[test]
    fn test_out_of_range_risk_is_clamped_before_scoring() {
        assert_eq!(compliance_score(&[violation(f64::NAN)]), 83);
        assert_eq!(compliance_score(&[violation(-1.0)]), 100);
    }

    #[test]
    fn test_error_overrides_status() {
        let finding = build_finding(
            "p1",
            "Tea",
            "us",
            vec![violation(0.6)],
            Some("AI scan failed. Please retry.".to_string()),
            None,
        );
        assert_eq!(finding.status, FindingStatus::Error);
        assert_eq!(finding.compliance_score, 79);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn score_is_pure_and_bounded(risks in proptest::collection::vec(-2.0f64..3.0, 0..10)) {
                let violations: Vec<_> = risks.iter().map(|r| violation(*r)).collect();
                let first = compliance_score(&violations);
                let second = compliance_score(&violations);
                prop_assert_eq!(first, second);
                prop_assert!(first <= 100);
            }
        }
    }
}
