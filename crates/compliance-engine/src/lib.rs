pub mod markets;
pub mod normalize;
pub mod notifications;
pub mod patterns;
pub mod rules;
pub mod scoring;

pub use markets::{get_policy_rules, law_focus, law_reference, supported_markets, LawReference};
pub use normalize::{dedupe_violations, migrate_results, normalize_violation, StoredFinding};
pub use notifications::{build_notifications, NOTIFICATION_LIMIT};
pub use patterns::{detect_matches, product_text, RuleMatch};
pub use scoring::{build_finding, compliance_score};

use shared_types::{ComplianceViolation, PolicyRule, Product};

/// Keyword-stage output for one product
#[derive(Debug, Clone, Default)]
pub struct HeuristicReport {
    pub matches: Vec<RuleMatch>,
    pub violations: Vec<ComplianceViolation>,
    /// Short lines describing the matches, for the AI prompt
    pub hints: Vec<String>,
}

/// ComplianceEngine entry point
pub struct ComplianceEngine;

impl ComplianceEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn rules_for(&self, market: &str) -> Vec<PolicyRule> {
        get_policy_rules(market)
    }

    /// Run the keyword stage over a product's combined text
    pub fn check_product(&self, product: &Product, market: &str) -> HeuristicReport {
        let text = product_text(product);
        self.check_text_report(&text, market)
    }

    /// Check compliance on raw text (for testing)
    pub fn check_text(&self, text: &str, market: &str) -> Vec<ComplianceViolation> {
        self.check_text_report(text, market).violations
    }

    fn check_text_report(&self, text: &str, market: &str) -> HeuristicReport {
        let rules = self.rules_for(market);
        let matches = detect_matches(text, &rules);
        let violations = rules::heuristic_violations(&matches, market);
        let hints = rules::heuristic_hints(&matches);

        tracing::debug!(
            market,
            rules = rules.len(),
            matched = matches.len(),
            "heuristic stage complete"
        );

        HeuristicReport {
            matches,
            violations,
            hints,
        }
    }
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new()
    }
}
