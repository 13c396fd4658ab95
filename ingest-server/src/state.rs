//! Application state shared across all request handlers.

use crate::config::ServerConfig;
use crate::lookup::HttpProductLookup;
use crate::observers::{ReportCollector, StageLogHandler};
use ingest_application::{BatchProcessor, InMemoryRecordStore, NoopProductLookup, ProductLookup};
use ingest_domain::eventing::{EventBus, EventLogger, EventMetrics, InMemoryEventBus};
use std::sync::Arc;

/// 总线在这里构建一次，并注入处理器与各个接口
#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<InMemoryEventBus>,
    pub processor: Arc<BatchProcessor>,
    pub store: Arc<InMemoryRecordStore>,
    pub metrics: Arc<EventMetrics>,
    pub reports: Arc<ReportCollector>,
}

impl AppState {
    pub fn new(product_lookup: Arc<dyn ProductLookup>, config: &ServerConfig) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let metrics = Arc::new(EventMetrics::new());
        let reports = Arc::new(ReportCollector::new());
        bus.register(Arc::new(EventLogger));
        bus.register(metrics.clone());
        bus.register(Arc::new(StageLogHandler));
        bus.register(reports.clone());

        let store = Arc::new(InMemoryRecordStore::new());
        let processor = BatchProcessor::builder()
            .event_bus(bus.clone())
            .product_lookup(product_lookup)
            .record_persister(store.clone())
            .config(config.processor.clone())
            .build();

        Self {
            bus,
            processor: Arc::new(processor),
            store,
            metrics,
            reports,
        }
    }

    /// 按配置选择商品查询实现
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let lookup: Arc<dyn ProductLookup> = match &config.product_api_url {
            Some(url) => {
                tracing::info!(%url, "product enrichment enabled");
                Arc::new(HttpProductLookup::new(url.clone(), config.lookup_timeout)?)
            }
            None => {
                tracing::info!("no product API configured, enrichment only tags records");
                Arc::new(NoopProductLookup)
            }
        };
        Ok(Self::new(lookup, config))
    }
}
