//! SQLite-backed [`ScanStore`]
//!
//! Results are stored as a JSON array and decoded through `migrate_results`,
//! so rows written in the legacy `issues[]` shape still load.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use compliance_engine::migrate_results;
use scan_pipeline::{ScanStore, StoreError};
use shared_types::{ProductScanHistory, Scan, ScanSchedule, ScanStatus, ScheduleFrequency};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::models::{DbHistoryPoint, DbSchedule, DbScan};

pub struct SqliteScanStore {
    pool: SqlitePool,
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Fixed-width RFC 3339 so TEXT ordering matches time ordering
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

fn to_score(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

impl SqliteScanStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        tracing::info!("Connecting to database: {}", database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scans (
                id TEXT PRIMARY KEY,
                shop_domain TEXT NOT NULL,
                market TEXT NOT NULL,
                compliance_score INTEGER NOT NULL DEFAULT 0,
                violations INTEGER NOT NULL DEFAULT 0,
                products_scanned INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'running',
                started_at TEXT NOT NULL,
                completed_at TEXT,
                results_json TEXT NOT NULL DEFAULT '[]'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_scans_shop_started ON scans(shop_domain, started_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS product_scan_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                scan_id TEXT NOT NULL,
                product_id TEXT NOT NULL,
                market TEXT NOT NULL,
                compliance_score INTEGER NOT NULL,
                violations INTEGER NOT NULL,
                scanned_at TEXT NOT NULL,
                UNIQUE (scan_id, product_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_history_product ON product_scan_history(product_id, scanned_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scan_schedules (
                shop_domain TEXT PRIMARY KEY,
                market TEXT NOT NULL,
                frequency TEXT NOT NULL,
                next_run_at TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl TryFrom<DbScan> for Scan {
    type Error = StoreError;

    fn try_from(row: DbScan) -> Result<Self, Self::Error> {
        let raw: serde_json::Value = serde_json::from_str(&row.results_json)?;
        let results = migrate_results(&raw, &row.market);

        Ok(Scan {
            id: row.id,
            shop_domain: row.shop_domain,
            market: row.market,
            compliance_score: to_score(row.compliance_score),
            violations: to_u32(row.violations),
            products_scanned: to_u32(row.products_scanned),
            status: ScanStatus::parse(&row.status),
            started_at: row.started_at,
            completed_at: row.completed_at,
            results,
        })
    }
}

impl From<DbHistoryPoint> for ProductScanHistory {
    fn from(row: DbHistoryPoint) -> Self {
        ProductScanHistory {
            scan_id: row.scan_id,
            product_id: row.product_id,
            market: row.market,
            compliance_score: to_score(row.compliance_score),
            violations: to_u32(row.violations),
            scanned_at: row.scanned_at,
        }
    }
}

impl From<DbSchedule> for ScanSchedule {
    fn from(row: DbSchedule) -> Self {
        let frequency = ScheduleFrequency::parse(&row.frequency).unwrap_or_else(|| {
            tracing::warn!(shop = %row.shop_domain, "unknown schedule frequency {:?}", row.frequency);
            ScheduleFrequency::Off
        });
        ScanSchedule {
            shop_domain: row.shop_domain,
            market: row.market,
            frequency,
            next_run_at: row.next_run_at,
            updated_at: row.updated_at,
        }
    }
}

const SCAN_COLUMNS: &str = "id, shop_domain, market, compliance_score, violations, \
    products_scanned, status, started_at, completed_at, results_json";

#[async_trait]
impl ScanStore for SqliteScanStore {
    async fn create_scan(&self, scan: &Scan) -> Result<(), StoreError> {
        let results_json = serde_json::to_string(&scan.results)?;

        sqlx::query(
            r#"
            INSERT INTO scans (id, shop_domain, market, compliance_score, violations,
                               products_scanned, status, started_at, completed_at, results_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&scan.id)
        .bind(&scan.shop_domain)
        .bind(&scan.market)
        .bind(i64::from(scan.compliance_score))
        .bind(i64::from(scan.violations))
        .bind(i64::from(scan.products_scanned))
        .bind(scan.status.as_str())
        .bind(timestamp(&scan.started_at))
        .bind(scan.completed_at.as_ref().map(timestamp))
        .bind(&results_json)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn find_scan(&self, scan_id: &str) -> Result<Option<Scan>, StoreError> {
        let row: Option<DbScan> =
            sqlx::query_as(&format!("SELECT {SCAN_COLUMNS} FROM scans WHERE id = ?"))
                .bind(scan_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        row.map(Scan::try_from).transpose()
    }

    async fn update_scan(&self, scan: &Scan) -> Result<(), StoreError> {
        let results_json = serde_json::to_string(&scan.results)?;

        let result = sqlx::query(
            r#"
            UPDATE scans
            SET market = ?, compliance_score = ?, violations = ?, products_scanned = ?,
                status = ?, completed_at = ?, results_json = ?
            WHERE id = ?
            "#,
        )
        .bind(&scan.market)
        .bind(i64::from(scan.compliance_score))
        .bind(i64::from(scan.violations))
        .bind(i64::from(scan.products_scanned))
        .bind(scan.status.as_str())
        .bind(scan.completed_at.as_ref().map(timestamp))
        .bind(&results_json)
        .bind(&scan.id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("scan {}", scan.id)));
        }
        Ok(())
    }

    async fn recent_scans(&self, shop_domain: &str, limit: usize) -> Result<Vec<Scan>, StoreError> {
        let rows: Vec<DbScan> = sqlx::query_as(&format!(
            "SELECT {SCAN_COLUMNS} FROM scans WHERE shop_domain = ? ORDER BY started_at DESC LIMIT ?"
        ))
        .bind(shop_domain)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Scan::try_from).collect()
    }

    async fn record_history(&self, points: &[ProductScanHistory]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        for point in points {
            sqlx::query(
                r#"
                INSERT INTO product_scan_history
                    (scan_id, product_id, market, compliance_score, violations, scanned_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (scan_id, product_id) DO UPDATE SET
                    market = excluded.market,
                    compliance_score = excluded.compliance_score,
                    violations = excluded.violations,
                    scanned_at = excluded.scanned_at
                "#,
            )
            .bind(&point.scan_id)
            .bind(&point.product_id)
            .bind(&point.market)
            .bind(i64::from(point.compliance_score))
            .bind(i64::from(point.violations))
            .bind(timestamp(&point.scanned_at))
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn product_history(
        &self,
        shop_domain: &str,
        product_id: &str,
        limit: usize,
    ) -> Result<Vec<ProductScanHistory>, StoreError> {
        let rows: Vec<DbHistoryPoint> = sqlx::query_as(
            r#"
            SELECT h.scan_id, h.product_id, h.market, h.compliance_score, h.violations, h.scanned_at
            FROM product_scan_history h
            JOIN scans s ON s.id = h.scan_id
            WHERE s.shop_domain = ? AND h.product_id = ?
            ORDER BY h.scanned_at DESC
            LIMIT ?
            "#,
        )
        .bind(shop_domain)
        .bind(product_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(ProductScanHistory::from).collect())
    }

    async fn upsert_schedule(&self, schedule: &ScanSchedule) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO scan_schedules (shop_domain, market, frequency, next_run_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (shop_domain) DO UPDATE SET
                market = excluded.market,
                frequency = excluded.frequency,
                next_run_at = excluded.next_run_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&schedule.shop_domain)
        .bind(&schedule.market)
        .bind(schedule.frequency.as_str())
        .bind(schedule.next_run_at.as_ref().map(timestamp))
        .bind(timestamp(&schedule.updated_at))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn find_schedule(&self, shop_domain: &str) -> Result<Option<ScanSchedule>, StoreError> {
        let row: Option<DbSchedule> = sqlx::query_as(
            r#"
            SELECT shop_domain, market, frequency, next_run_at, updated_at
            FROM scan_schedules
            WHERE shop_domain = ?
            "#,
        )
        .bind(shop_domain)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(ScanSchedule::from))
    }
}
