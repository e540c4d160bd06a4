//! Application state for the scan API

use std::sync::Arc;

use anyhow::Result;
use scan_pipeline::{PipelineConfig, ScanOrchestrator, ScanStore};

use crate::store::SqliteScanStore;

pub struct AppState {
    pub store: Arc<dyn ScanStore>,
    pub orchestrator: ScanOrchestrator,
    pub config: PipelineConfig,
}

impl AppState {
    /// Open (and migrate) the database, then wire the pipeline
    pub async fn connect(database_url: &str, config: PipelineConfig) -> Result<Self> {
        let store = SqliteScanStore::connect(database_url, 5).await?;
        Self::new(Arc::new(store), config)
    }

    pub fn new(store: Arc<dyn ScanStore>, config: PipelineConfig) -> Result<Self> {
        let analyzer = config.build_analyzer()?;
        let orchestrator =
            ScanOrchestrator::new(Arc::clone(&store), analyzer).with_page_size(config.page_size);

        Ok(Self {
            store,
            orchestrator,
            config,
        })
    }
}
