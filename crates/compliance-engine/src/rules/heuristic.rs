use crate::markets::law_reference;
use crate::normalize::severity_risk;
use crate::patterns::{slugify, RuleMatch};
use shared_types::ComplianceViolation;

/// Upper bound on hint lines handed to the AI prompt
pub const MAX_HINTS: usize = 6;

/// One violation per matched rule, scored from the rule's severity
pub fn heuristic_violations(matches: &[RuleMatch], market: &str) -> Vec<ComplianceViolation> {
    let reference = law_reference(market);

    matches
        .iter()
        .filter_map(|m| {
            let keyword = m.matching_keywords.first()?;
            Some(ComplianceViolation {
                issue: format!("{}: \"{}\"", m.rule.category, keyword),
                policy: m.rule.category.clone(),
                law: reference.law.to_string(),
                severity: m.rule.severity,
                risk_score: severity_risk(m.rule.severity),
                suggestion: format!(
                    "{}. Remove or substantiate the wording \"{}\".",
                    m.rule.description, keyword
                ),
                why_matters: format!(
                    "Listings flagged for {} can be disapproved or expose the store to enforcement.",
                    m.rule.category.to_lowercase()
                ),
                rule_ref: slugify(&m.rule.category),
                source_url: Some(reference.source_url.to_string()),
            })
        })
        .collect()
}

/// Prompt hint lines such as `Medical Claims (High): cure, heal`
pub fn heuristic_hints(matches: &[RuleMatch]) -> Vec<String> {
    matches
        .iter()
        .take(MAX_HINTS)
        .map(|m| {
            format!(
                "{} ({}): {}",
                m.rule.category,
                m.rule.severity,
                m.matching_keywords.join(", ")
            )
        })
        .collect()
}
