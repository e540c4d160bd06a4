//! Full scans and single-product rescans
//!
//! Products are analyzed one at a time in catalog order. Concurrent rescans
//! of the same scan are not serialized: both read, both upsert, and the last
//! `update_scan` wins the aggregate fields.

use std::sync::Arc;

use chrono::Utc;
use compliance_engine::markets::market_key;
use compliance_engine::{build_finding, dedupe_violations, ComplianceEngine};
use shared_types::{ComplianceFinding, Product, ProductScanHistory, Scan};
use uuid::Uuid;

use crate::analyzer::AiAnalyzer;
use crate::catalog::{fetch_all_products, fetch_product_by_id, AdminGraphql, DEFAULT_PAGE_SIZE};
use crate::error::PipelineError;
use crate::store::ScanStore;

pub struct ScanOrchestrator {
    store: Arc<dyn ScanStore>,
    analyzer: AiAnalyzer,
    engine: ComplianceEngine,
    page_size: u32,
}

impl ScanOrchestrator {
    pub fn new(store: Arc<dyn ScanStore>, analyzer: AiAnalyzer) -> Self {
        Self {
            store,
            analyzer,
            engine: ComplianceEngine::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn store(&self) -> &Arc<dyn ScanStore> {
        &self.store
    }

    /// Heuristic stage, AI stage, merge and score for one product
    pub async fn analyze_product(
        &self,
        product: &Product,
        market: &str,
        shop_domain: &str,
    ) -> ComplianceFinding {
        let report = self.engine.check_product(product, market);
        let ai = self
            .analyzer
            .analyze(product, market, shop_domain, &report.hints)
            .await;

        let mut violations = report.violations;
        violations.extend(ai.violations);
        let violations = dedupe_violations(violations);

        let finding = build_finding(
            &product.id,
            &product.title,
            market,
            violations,
            ai.error_message,
            ai.rewrite,
        );

        tracing::debug!(
            product_id = %product.id,
            heuristic_matches = report.matches.len(),
            violations = finding.violations.len(),
            score = finding.compliance_score,
            status = ?finding.status,
            "product analyzed"
        );

        finding
    }

    pub async fn run_full_scan(
        &self,
        admin: &dyn AdminGraphql,
        shop_domain: &str,
        market: &str,
    ) -> Result<Scan, PipelineError> {
        let market = market_key(market);
        let products = fetch_all_products(admin, self.page_size).await?;
        if products.is_empty() {
            tracing::info!(shop = shop_domain, "no products to scan");
            return Err(PipelineError::NoProducts);
        }

        let mut scan = Scan::start(Uuid::new_v4().to_string(), shop_domain, &market, Utc::now());
        self.store.create_scan(&scan).await?;
        tracing::info!(
            shop = shop_domain,
            scan_id = %scan.id,
            market = %market,
            products = products.len(),
            "scan started"
        );

        for product in &products {
            let finding = self.analyze_product(product, &market, shop_domain).await;
            scan.upsert_finding(finding);
        }

        let completed_at = Utc::now();
        scan.complete(completed_at);
        self.store.update_scan(&scan).await?;

        let points: Vec<ProductScanHistory> = scan
            .results
            .iter()
            .map(|finding| ProductScanHistory::from_finding(&scan.id, finding, completed_at))
            .collect();
        self.store.record_history(&points).await?;

        tracing::info!(
            shop = shop_domain,
            scan_id = %scan.id,
            score = scan.compliance_score,
            violations = scan.violations,
            "scan completed"
        );

        Ok(scan)
    }

    pub async fn rescan_single_product(
        &self,
        admin: &dyn AdminGraphql,
        scan_id: &str,
        product_id: &str,
        shop_domain: &str,
    ) -> Result<Scan, PipelineError> {
        let mut scan = match self.store.find_scan(scan_id).await? {
            Some(scan) if scan.shop_domain == shop_domain => scan,
            Some(_) => {
                tracing::warn!(shop = shop_domain, scan_id, "rescan requested for another shop's scan");
                return Err(PipelineError::ScanNotFound);
            }
            None => return Err(PipelineError::ScanNotFound),
        };

        let product = fetch_product_by_id(admin, product_id)
            .await?
            .ok_or_else(|| PipelineError::ProductNotFound(product_id.to_string()))?;

        let market = scan.market.clone();
        let finding = self.analyze_product(&product, &market, shop_domain).await;
        let replaced = scan.upsert_finding(finding);
        scan.recompute_aggregates();
        self.store.update_scan(&scan).await?;

        if let Some(finding) = scan.results.iter().find(|f| f.product_id == product.id) {
            let point = ProductScanHistory::from_finding(&scan.id, finding, Utc::now());
            self.store.record_history(&[point]).await?;
        }

        tracing::info!(
            shop = shop_domain,
            scan_id,
            product_id,
            replaced,
            score = scan.compliance_score,
            "product rescanned"
        );

        Ok(scan)
    }
}
