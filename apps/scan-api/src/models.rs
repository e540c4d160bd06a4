//! Request, response and row models for the scan API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{Notification, PolicyRule, ProductScanHistory, ScanSchedule};
use sqlx::FromRow;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PolicyListResponse {
    pub success: bool,
    pub market: String,
    pub rules: Vec<PolicyRule>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScanRequest {
    pub shop_domain: String,
    #[serde(default)]
    pub market: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescanRequest {
    pub shop_domain: String,
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub shop: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[serde(default)]
    pub shop: String,
    pub product_id: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub success: bool,
    pub notifications: Vec<Notification>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<ProductScanHistory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub shop_domain: String,
    #[serde(default)]
    pub market: Option<String>,
    pub frequency: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub success: bool,
    pub schedule: ScanSchedule,
}

/// Row in the `scans` table
#[derive(Debug, FromRow)]
pub struct DbScan {
    pub id: String,
    pub shop_domain: String,
    pub market: String,
    pub compliance_score: i64,
    pub violations: i64,
    pub products_scanned: i64,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub results_json: String,
}

/// Row in the `product_scan_history` table
#[derive(Debug, FromRow)]
pub struct DbHistoryPoint {
    pub scan_id: String,
    pub product_id: String,
    pub market: String,
    pub compliance_score: i64,
    pub violations: i64,
    pub scanned_at: DateTime<Utc>,
}

/// Row in the `scan_schedules` table
#[derive(Debug, FromRow)]
pub struct DbSchedule {
    pub shop_domain: String,
    pub market: String,
    pub frequency: String,
    pub next_run_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
