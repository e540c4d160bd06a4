//! Dashboard alerts derived from recent scans
//!
//! Nothing here is persisted; alerts are rebuilt from scan history on every
//! dashboard load. Ids are stable across rebuilds so the UI can remember
//! dismissals.

use std::collections::HashSet;

use shared_types::{Notification, Scan, Severity};

/// Maximum alerts returned to the dashboard
pub const NOTIFICATION_LIMIT: usize = 20;

/// Risk at or above which a non-High violation still raises an alert
pub const HIGH_RISK_THRESHOLD: f64 = 0.75;

/// Alerts for High or high-risk violations, newest scans first
pub fn build_notifications(scans: &[Scan], limit: usize) -> Vec<Notification> {
    let mut ordered: Vec<&Scan> = scans.iter().collect();
    ordered.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));

    let mut seen = HashSet::new();
    let mut notifications = Vec::new();
    if limit == 0 {
        return notifications;
    }

    for scan in ordered {
        for finding in &scan.results {
            for violation in &finding.violations {
                if violation.severity != Severity::High
                    && violation.risk_score < HIGH_RISK_THRESHOLD
                {
                    continue;
                }

                let id = format!("{}-{}-{}", scan.id, finding.product_id, violation.rule_ref);
                if !seen.insert(id.clone()) {
                    continue;
                }

                let message = if violation.why_matters.is_empty() {
                    violation.suggestion.clone()
                } else {
                    violation.why_matters.clone()
                };

                notifications.push(Notification {
                    id,
                    scan_id: scan.id.clone(),
                    product_id: finding.product_id.clone(),
                    product_title: finding.product_title.clone(),
                    market: finding.market.clone(),
                    title: violation.issue.clone(),
                    message,
                    severity: violation.severity,
                    risk_score: violation.risk_score,
                    created_at: scan.last_activity(),
                });

                if notifications.len() >= limit {
                    return notifications;
                }
            }
        }
    }

    notifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shared_types::{ComplianceFinding, ComplianceViolation, FindingStatus};

    fn violation(rule_ref: &str, severity: Severity, risk: f64) -> ComplianceViolation {
        ComplianceViolation {
            issue: format!("{} issue", rule_ref),
            policy: rule_ref.to_string(),
            law: "law".to_string(),
            severity,
            risk_score: risk,
            suggestion: "fix it".to_string(),
            why_matters: String::new(),
            rule_ref: rule_ref.to_string(),
            source_url: None,
        }
    }

    fn scan(id: &str, age_minutes: i64, violations: Vec<ComplianceViolation>) -> Scan {
        let mut scan = Scan::start(
            id.to_string(),
            "shop.example",
            "us",
            Utc::now() - Duration::minutes(age_minutes),
        );
        scan.upsert_finding(ComplianceFinding {
            product_id: "p1".to_string(),
            product_title: "Tea".to_string(),
            market: "us".to_string(),
            violations,
            compliance_score: 50,
            status: FindingStatus::Flagged,
            error_message: None,
            rewrite: None,
        });
        scan
    }

    #[test]
    fn test_filters_to_high_severity_or_high_risk() {
        let scans = vec![scan(
            "s1",
            0,
            vec![
                violation("medical-claims", Severity::High, 0.5),
                violation("pricing-claims", Severity::Low, 0.3),
                violation("misleading-claims", Severity::Medium, 0.8),
            ],
        )];
        let notifications = build_notifications(&scans, NOTIFICATION_LIMIT);
        let ids: Vec<_> = notifications.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["s1-p1-medical-claims", "s1-p1-misleading-claims"]);
        assert_eq!(notifications[0].message, "fix it");
    }

    #[test]
    fn test_zero_limit_yields_nothing() {
        let scans = vec![scan(
            "s1",
            0,
            vec![violation("medical-claims", Severity::High, 0.92)],
        )];
        assert!(build_notifications(&scans, 0).is_empty());
    }

    #[test]
    fn test_dedupes_same_rule_same_product() {
        let scans = vec![scan(
            "s1",
            0,
            vec![
                violation("medical-claims", Severity::High, 0.92),
                ComplianceViolation {
                    issue: "another wording".to_string(),
                    ..violation("medical-claims", Severity::High, 0.92)
                },
            ],
        )];
        assert_eq!(build_notifications(&scans, NOTIFICATION_LIMIT).len(), 1);
    }

    #[test]
    fn test_newest_scans_first_and_truncated() {
        let many: Vec<_> = (0..15)
            .map(|i| violation(&format!("rule-{}", i), Severity::High, 0.92))
            .collect();
        let scans = vec![scan("old", 60, many.clone()), scan("new", 1, many)];

        let notifications = build_notifications(&scans, NOTIFICATION_LIMIT);
        assert_eq!(notifications.len(), NOTIFICATION_LIMIT);
        assert!(notifications[..15].iter().all(|n| n.scan_id == "new"));
        assert!(notifications[15..].iter().all(|n| n.scan_id == "old"));
    }
}
