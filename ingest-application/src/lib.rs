//! 数据处理流水线（ingest-application）
//!
//! 将原始批次依次经过 归一化 → 校验 → 富化 → 去重 → 持久化 五个阶段，
//! 并在关键节点向事件总线发布生命周期事件。
//!
//! 外部协作方以 trait 注入：
//! - `ProductLookup`：按 SKU 查询商品信息，用于富化；
//! - `RecordPersister`：逐条持久化清洗后的记录。
//!
pub mod config;
pub mod error;
pub mod processor;
pub mod product_lookup;
pub mod record_persister;
pub mod stages;

pub use config::ProcessorConfig;
pub use error::{LookupError, PersistError, Stage, StageError, StageFailure};
pub use processor::BatchProcessor;
pub use product_lookup::{CatalogProductLookup, NoopProductLookup, ProductLookup};
pub use record_persister::{InMemoryRecordStore, RecordPersister};
