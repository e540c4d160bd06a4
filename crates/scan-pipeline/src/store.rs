//! Scan persistence
//!
//! The orchestrator only sees [`ScanStore`]. `MemoryScanStore` backs tests and
//! single-process runs; the server wires an SQLite implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use shared_types::{ProductScanHistory, Scan, ScanSchedule};
use tokio::sync::RwLock;

use crate::error::StoreError;

#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn create_scan(&self, scan: &Scan) -> Result<(), StoreError>;

    async fn find_scan(&self, scan_id: &str) -> Result<Option<Scan>, StoreError>;

    /// Overwrite an existing scan; `NotFound` if it was never created
    async fn update_scan(&self, scan: &Scan) -> Result<(), StoreError>;

    /// Newest first by start time
    async fn recent_scans(&self, shop_domain: &str, limit: usize) -> Result<Vec<Scan>, StoreError>;

    /// Upsert on `(scan_id, product_id)`
    async fn record_history(&self, points: &[ProductScanHistory]) -> Result<(), StoreError>;

    /// Points for `product_id` from scans owned by `shop_domain`, newest first
    async fn product_history(
        &self,
        shop_domain: &str,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<ProductScanHistory>, StoreError>;

    async fn upsert_schedule(&self, schedule: &ScanSchedule) -> Result<(), StoreError>;

    async fn find_schedule(&self, shop_domain: &str) -> Result<Option<ScanSchedule>, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    scans: HashMap<String, Scan>,
    history: Vec<ProductScanHistory>,
    schedules: HashMap<String, ScanSchedule>,
}

#[derive(Debug, Default)]
pub struct MemoryScanStore {
    state: RwLock<MemoryState>,
}

impl MemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScanStore for MemoryScanStore {
    async fn create_scan(&self, scan: &Scan) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.scans.contains_key(&scan.id) {
            return Err(StoreError::Backend(format!("scan {} already exists", scan.id)));
        }
        state.scans.insert(scan.id.clone(), scan.clone());
        Ok(())
    }

    async fn find_scan(&self, scan_id: &str) -> Result<Option<Scan>, StoreError> {
        Ok(self.state.read().await.scans.get(scan_id).cloned())
    }

    async fn update_scan(&self, scan: &Scan) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state.scans.get_mut(&scan.id) {
            Some(existing) => {
                *existing = scan.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("scan {}", scan.id))),
        }
    }

    async fn recent_scans(&self, shop_domain: &str, limit: usize) -> Result<Vec<Scan>, StoreError> {
        let state = self.state.read().await;
        let mut scans: Vec<Scan> = state
            .scans
            .values()
            .filter(|scan| scan.shop_domain == shop_domain)
            .cloned()
            .collect();
        scans.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        scans.truncate(limit);
        Ok(scans)
    }

    async fn record_history(&self, points: &[ProductScanHistory]) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        for point in points {
            match state
                .history
                .iter_mut()
                .find(|p| p.scan_id == point.scan_id && p.product_id == point.product_id)
            {
                Some(existing) => *existing = point.clone(),
                None => state.history.push(point.clone()),
            }
        }
        Ok(())
    }

    async fn product_history(
        &self,
        shop_domain: &str,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<ProductScanHistory>, StoreError> {
        let state = self.state.read().await;
        let mut points: Vec<ProductScanHistory> = state
            .history
            .iter()
            .filter(|p| p.product_id == product_id)
            .filter(|p| {
                state
                    .scans
                    .get(&p.scan_id)
                    .is_some_and(|scan| scan.shop_domain == shop_domain)
            })
            .cloned()
            .collect();
        points.sort_by(|a, b| b.scanned_at.cmp(&a.scanned_at));
        points.truncate(limit);
        Ok(points)
    }

    async fn upsert_schedule(&self, schedule: &ScanSchedule) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .schedules
            .insert(schedule.shop_domain.clone(), schedule.clone());
        Ok(())
    }

    async fn find_schedule(&self, shop_domain: &str) -> Result<Option<ScanSchedule>, StoreError> {
        Ok(self.state.read().await.schedules.get(shop_domain).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use shared_types::ScheduleFrequency;

    fn point(scan_id: &str, product_id: &str, score: u8, minutes_ago: i64) -> ProductScanHistory {
        ProductScanHistory {
            scan_id: scan_id.to_string(),
            product_id: product_id.to_string(),
            market: "us".to_string(),
            compliance_score: score,
            violations: 1,
            scanned_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn update_requires_existing_scan() {
        let store = MemoryScanStore::new();
        let scan = Scan::start("s1".to_string(), "shop.example", "us", Utc::now());
        assert!(matches!(
            store.update_scan(&scan).await,
            Err(StoreError::NotFound(_))
        ));

        store.create_scan(&scan).await.unwrap();
        assert!(store.create_scan(&scan).await.is_err());
        store.update_scan(&scan).await.unwrap();
        assert_eq!(store.find_scan("s1").await.unwrap(), Some(scan));
    }

    #[tokio::test]
    async fn history_upserts_on_scan_and_product() {
        let store = MemoryScanStore::new();
        for id in ["s1", "s2"] {
            let scan = Scan::start(id.to_string(), "shop.example", "us", Utc::now());
            store.create_scan(&scan).await.unwrap();
        }
        store
            .record_history(&[point("s1", "p1", 40, 10), point("s2", "p1", 60, 5)])
            .await
            .unwrap();
        store.record_history(&[point("s1", "p1", 90, 1)]).await.unwrap();

        let history = store.product_history("shop.example", "p1", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].scan_id, "s1");
        assert_eq!(history[0].compliance_score, 90);
        assert_eq!(history[1].scan_id, "s2");
    }

    #[tokio::test]
    async fn history_is_scoped_to_the_owning_shop() {
        let store = MemoryScanStore::new();
        let scan = Scan::start("s1".to_string(), "one.example", "us", Utc::now());
        store.create_scan(&scan).await.unwrap();
        store.record_history(&[point("s1", "p1", 70, 1)]).await.unwrap();

        assert_eq!(store.product_history("one.example", "p1", 10).await.unwrap().len(), 1);
        assert!(store
            .product_history("two.example", "p1", 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn recent_scans_filters_by_shop_and_orders_newest_first() {
        let store = MemoryScanStore::new();
        let now = Utc::now();
        for (id, shop, age) in [("a", "one", 30), ("b", "one", 10), ("c", "two", 1)] {
            let scan = Scan::start(id.to_string(), shop, "us", now - Duration::minutes(age));
            store.create_scan(&scan).await.unwrap();
        }

        let ids: Vec<String> = store
            .recent_scans("one", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|scan| scan.id)
            .collect();
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(store.recent_scans("one", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn schedules_replace_per_shop() {
        let store = MemoryScanStore::new();
        let now = Utc::now();
        let mut schedule = ScanSchedule {
            shop_domain: "shop.example".to_string(),
            market: "us".to_string(),
            frequency: ScheduleFrequency::Daily,
            next_run_at: ScheduleFrequency::Daily.next_run_after(now),
            updated_at: now,
        };
        store.upsert_schedule(&schedule).await.unwrap();
        schedule.frequency = ScheduleFrequency::Off;
        schedule.next_run_at = None;
        store.upsert_schedule(&schedule).await.unwrap();

        assert_eq!(
            store.find_schedule("shop.example").await.unwrap(),
            Some(schedule)
        );
        assert!(store.find_schedule("other").await.unwrap().is_none());
    }
}
