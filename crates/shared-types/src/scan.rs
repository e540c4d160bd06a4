//! Scan snapshots, per-product history points, schedules and alerts

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ComplianceFinding, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    /// Parse a stored status; unknown values read as `Failed`
    pub fn parse(value: &str) -> Self {
        match value {
            "running" => ScanStatus::Running,
            "completed" => ScanStatus::Completed,
            _ => ScanStatus::Failed,
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compliance pass over a shop's catalog
///
/// The scan owns `results` exclusively. Aggregate fields must be refreshed
/// with [`Scan::recompute_aggregates`] after any change to `results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub id: String,
    pub shop_domain: String,
    pub market: String,
    pub compliance_score: u8,
    pub violations: u32,
    pub products_scanned: u32,
    pub status: ScanStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Vec<ComplianceFinding>,
}

impl Scan {
    /// A fresh scan in the `running` state with no results
    pub fn start(id: String, shop_domain: &str, market: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            shop_domain: shop_domain.to_string(),
            market: market.to_string(),
            compliance_score: 0,
            violations: 0,
            products_scanned: 0,
            status: ScanStatus::Running,
            started_at,
            completed_at: None,
            results: Vec::new(),
        }
    }

    /// Replace the finding for the same product in place, or append it.
    ///
    /// Returns true when an existing finding was replaced.
    pub fn upsert_finding(&mut self, finding: ComplianceFinding) -> bool {
        match self
            .results
            .iter_mut()
            .find(|existing| existing.product_id == finding.product_id)
        {
            Some(existing) => {
                *existing = finding;
                true
            }
            None => {
                self.results.push(finding);
                false
            }
        }
    }

    /// Recompute score, violation total and product count from `results`
    pub fn recompute_aggregates(&mut self) {
        self.compliance_score = mean_score(&self.results);
        self.violations = self
            .results
            .iter()
            .map(|finding| finding.violations.len() as u32)
            .sum();
        self.products_scanned = self.results.len() as u32;
    }

    pub fn complete(&mut self, completed_at: DateTime<Utc>) {
        self.recompute_aggregates();
        self.status = ScanStatus::Completed;
        self.completed_at = Some(completed_at);
    }

    /// Timestamp used to order scans newest-first
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.started_at)
    }
}

/// Rounded mean of finding scores, 0 when there are no findings
pub fn mean_score(findings: &[ComplianceFinding]) -> u8 {
    if findings.is_empty() {
        return 0;
    }
    let total: u32 = findings.iter().map(|f| f.compliance_score as u32).sum();
    let mean = total as f64 / findings.len() as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

/// Time-series point for per-product trend charts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductScanHistory {
    pub scan_id: String,
    pub product_id: String,
    pub market: String,
    pub compliance_score: u8,
    pub violations: u32,
    pub scanned_at: DateTime<Utc>,
}

impl ProductScanHistory {
    pub fn from_finding(scan_id: &str, finding: &ComplianceFinding, scanned_at: DateTime<Utc>) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            product_id: finding.product_id.clone(),
            market: finding.market.clone(),
            compliance_score: finding.compliance_score,
            violations: finding.violations.len() as u32,
            scanned_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleFrequency {
    Off,
    Daily,
    Weekly,
    Monthly,
}

impl ScheduleFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleFrequency::Off => "off",
            ScheduleFrequency::Daily => "daily",
            ScheduleFrequency::Weekly => "weekly",
            ScheduleFrequency::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "off" => Some(ScheduleFrequency::Off),
            "daily" => Some(ScheduleFrequency::Daily),
            "weekly" => Some(ScheduleFrequency::Weekly),
            "monthly" => Some(ScheduleFrequency::Monthly),
            _ => None,
        }
    }

    /// Next due time after `from`; `None` when scheduling is off
    pub fn next_run_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ScheduleFrequency::Off => None,
            ScheduleFrequency::Daily => Some(from + Duration::days(1)),
            ScheduleFrequency::Weekly => Some(from + Duration::days(7)),
            ScheduleFrequency::Monthly => Some(from + Duration::days(30)),
        }
    }
}

/// Recurring scan preference for a shop (one row per shop)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSchedule {
    pub shop_domain: String,
    pub market: String,
    pub frequency: ScheduleFrequency,
    #[serde(default)]
    pub next_run_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Dashboard alert derived from a high-risk violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String, // "{scanId}-{productId}-{ruleRef}"
    pub scan_id: String,
    pub product_id: String,
    pub product_title: String,
    pub market: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub risk_score: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComplianceViolation, FindingStatus};
    use pretty_assertions::assert_eq;

    fn violation(issue: &str) -> ComplianceViolation {
        ComplianceViolation {
            issue: issue.to_string(),
            policy: "Medical Claims".to_string(),
            law: "Google Ads policies".to_string(),
            severity: Severity::High,
            risk_score: 0.92,
            suggestion: String::new(),
            why_matters: String::new(),
            rule_ref: "medical-claims".to_string(),
            source_url: None,
        }
    }

    fn finding(product_id: &str, score: u8, violations: usize) -> ComplianceFinding {
        ComplianceFinding {
            product_id: product_id.to_string(),
            product_title: format!("Product {}", product_id),
            market: "us".to_string(),
            violations: (0..violations).map(|i| violation(&format!("issue {}", i))).collect(),
            compliance_score: score,
            status: if violations == 0 {
                FindingStatus::Clean
            } else {
                FindingStatus::Flagged
            },
            error_message: None,
            rewrite: None,
        }
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut scan = Scan::start("s1".into(), "shop.example", "us", Utc::now());
        scan.upsert_finding(finding("a", 100, 0));
        scan.upsert_finding(finding("b", 68, 1));
        scan.upsert_finding(finding("c", 100, 0));

        let replaced = scan.upsert_finding(finding("b", 100, 0));

        assert!(replaced);
        let ids: Vec<_> = scan.results.iter().map(|f| f.product_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(scan.results[1].compliance_score, 100);
    }

    #[test]
    fn test_upsert_appends_unknown_product() {
        let mut scan = Scan::start("s1".into(), "shop.example", "us", Utc::now());
        scan.upsert_finding(finding("a", 100, 0));
        let replaced = scan.upsert_finding(finding("z", 40, 2));
        assert!(!replaced);
        assert_eq!(scan.results.last().unwrap().product_id, "z");
    }

    #[test]
    fn test_recompute_aggregates() {
        let mut scan = Scan::start("s1".into(), "shop.example", "us", Utc::now());
        scan.upsert_finding(finding("a", 100, 0));
        scan.upsert_finding(finding("b", 67, 1));
        scan.upsert_finding(finding("c", 36, 2));
        scan.recompute_aggregates();

        // (100 + 67 + 36) / 3 = 67.67
        assert_eq!(scan.compliance_score, 68);
        assert_eq!(scan.violations, 3);
        assert_eq!(scan.products_scanned, 3);
    }

    #[test]
    fn test_mean_score_empty_is_zero() {
        assert_eq!(mean_score(&[]), 0);
    }

    #[test]
    fn test_complete_sets_status_and_timestamp() {
        let started = Utc::now();
        let mut scan = Scan::start("s1".into(), "shop.example", "us", started);
        scan.upsert_finding(finding("a", 90, 1));
        scan.complete(started + Duration::seconds(5));
        assert_eq!(scan.status, ScanStatus::Completed);
        assert_eq!(scan.last_activity(), started + Duration::seconds(5));
        assert_eq!(scan.compliance_score, 90);
    }

    #[test]
    fn test_schedule_next_run() {
        let now = Utc::now();
        assert_eq!(ScheduleFrequency::Off.next_run_after(now), None);
        assert_eq!(
            ScheduleFrequency::Weekly.next_run_after(now),
            Some(now + Duration::days(7))
        );
        assert_eq!(ScheduleFrequency::parse(" Daily "), Some(ScheduleFrequency::Daily));
        assert_eq!(ScheduleFrequency::parse("hourly"), None);
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [ScanStatus::Running, ScanStatus::Completed, ScanStatus::Failed] {
            assert_eq!(ScanStatus::parse(status.as_str()), status);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Upserting the same product repeatedly keeps exactly one finding for it
            #[test]
            fn upsert_is_idempotent(
                ids in proptest::collection::vec("[a-e]", 0..8),
                target in "[a-e]",
                score in 0u8..=100,
            ) {
                let mut scan = Scan::start("s".into(), "shop.example", "us", Utc::now());
                for id in &ids {
                    scan.upsert_finding(finding(id, 50, 1));
                }
                scan.upsert_finding(finding(&target, score, 0));
                scan.recompute_aggregates();
                let once = scan.clone();

                scan.upsert_finding(finding(&target, score, 0));
                scan.recompute_aggregates();

                prop_assert_eq!(&scan, &once);
                let count = scan.results.iter().filter(|f| f.product_id == target).count();
                prop_assert_eq!(count, 1);
            }
        }
    }
}
