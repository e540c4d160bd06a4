//! HTTP handlers for the scan API

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use compliance_engine::markets::market_key;
use compliance_engine::{build_notifications, get_policy_rules, NOTIFICATION_LIMIT};
use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{Scan, ScanSchedule, ScheduleFrequency};

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

/// Scans considered when building dashboard notifications
pub const NOTIFICATION_SCAN_WINDOW: usize = 10;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 200;

const ACCESS_TOKEN_HEADER: &str = "x-shopify-access-token";

lazy_static! {
    static ref SHOP_DOMAIN_PATTERN: Regex =
        Regex::new(r"^[a-z0-9][a-z0-9-]*\.myshopify\.com$").unwrap();
}

fn access_token(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingToken)
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::InvalidRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Required `*.myshopify.com` host, lowercased
fn shop_domain(value: &str, field: &str) -> Result<String, ApiError> {
    let shop = required(value, field)?.to_lowercase();
    if !SHOP_DOMAIN_PATTERN.is_match(&shop) {
        return Err(ApiError::InvalidRequest(format!(
            "{field} must be a *.myshopify.com domain"
        )));
    }
    Ok(shop)
}

/// Handler: GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "scan-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: GET /api/policies/:market
pub async fn list_policies(Path(market): Path<String>) -> Json<PolicyListResponse> {
    let rules = get_policy_rules(&market);
    let count = rules.len();
    Json(PolicyListResponse {
        success: true,
        market: market_key(&market),
        rules,
        count,
    })
}

/// Handler: POST /api/scans
pub async fn create_scan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateScanRequest>,
) -> Result<Json<Scan>, ApiError> {
    let token = access_token(&headers)?;
    let shop = shop_domain(&req.shop_domain, "shopDomain")?;
    let market = market_key(req.market.as_deref().unwrap_or_default());

    let admin = state.config.shopify_client(&shop, &token)?;
    let scan = state
        .orchestrator
        .run_full_scan(&admin, &shop, &market)
        .await?;

    Ok(Json(scan))
}

/// Handler: GET /api/scans/:id?shop=
pub async fn get_scan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ShopQuery>,
) -> Result<Json<Scan>, ApiError> {
    let scan = state
        .store
        .find_scan(&id)
        .await?
        .filter(|scan| scan.shop_domain == query.shop.trim())
        .ok_or_else(|| ApiError::NotFound("Scan".to_string()))?;

    Ok(Json(scan))
}

/// Handler: POST /api/scans/:id/rescan
pub async fn rescan_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RescanRequest>,
) -> Result<Json<Scan>, ApiError> {
    let token = access_token(&headers)?;
    let shop = shop_domain(&req.shop_domain, "shopDomain")?;
    let product_id = required(&req.product_id, "productId")?;

    let admin = state.config.shopify_client(&shop, &token)?;
    let scan = state
        .orchestrator
        .rescan_single_product(&admin, &id, &product_id, &shop)
        .await?;

    Ok(Json(scan))
}

/// Handler: GET /api/notifications?shop=
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ShopQuery>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let shop = required(&query.shop, "shop")?;
    let scans = state
        .store
        .recent_scans(&shop, NOTIFICATION_SCAN_WINDOW)
        .await?;
    let notifications = build_notifications(&scans, NOTIFICATION_LIMIT);
    let count = notifications.len();

    Ok(Json(NotificationListResponse {
        success: true,
        notifications,
        count,
    }))
}

/// Handler: GET /api/history?shop=&productId=
pub async fn product_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let shop = required(&query.shop, "shop")?;
    let product_id = required(&query.product_id, "productId")?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let history = state
        .store
        .product_history(&shop, &product_id, limit)
        .await?;

    Ok(Json(HistoryResponse {
        success: true,
        history,
    }))
}

/// Handler: PUT /api/schedules
pub async fn upsert_schedule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let shop = shop_domain(&req.shop_domain, "shopDomain")?;
    let frequency = ScheduleFrequency::parse(&req.frequency).ok_or_else(|| {
        ApiError::InvalidRequest(format!(
            "frequency must be one of off, daily, weekly, monthly (got {:?})",
            req.frequency
        ))
    })?;

    let now = Utc::now();
    let schedule = ScanSchedule {
        shop_domain: shop,
        market: market_key(req.market.as_deref().unwrap_or_default()),
        frequency,
        next_run_at: frequency.next_run_after(now),
        updated_at: now,
    };
    state.store.upsert_schedule(&schedule).await?;

    tracing::info!(
        shop = %schedule.shop_domain,
        frequency = schedule.frequency.as_str(),
        "scan schedule updated"
    );

    Ok(Json(ScheduleResponse {
        success: true,
        schedule,
    }))
}

/// Handler: GET /api/schedules/:shop
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(shop): Path<String>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let schedule = state
        .store
        .find_schedule(shop.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("Schedule".to_string()))?;

    Ok(Json(ScheduleResponse {
        success: true,
        schedule,
    }))
}
