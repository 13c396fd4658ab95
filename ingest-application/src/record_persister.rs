//! 记录持久化（RecordPersister）
//!
//! 持久化阶段对每条清洗后的记录调用一次 `persist`。流水线在第 4 阶段之后
//! 不再去重，若调用方自行重试，实现需保证幂等。
//!
use crate::error::PersistError;
use async_trait::async_trait;
use dashmap::DashMap;
use ingest_domain::{ProcessedRecord, RecordType};

#[async_trait]
pub trait RecordPersister: Send + Sync {
    async fn persist(&self, record: &ProcessedRecord) -> Result<(), PersistError>;
}

/// 基于内存的持久化实现，按实体类型分组保存
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<RecordType, Vec<ProcessedRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定实体类型的已保存记录（按写入顺序）
    pub fn records(&self, entity: RecordType) -> Vec<ProcessedRecord> {
        self.records
            .get(&entity)
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordPersister for InMemoryRecordStore {
    async fn persist(&self, record: &ProcessedRecord) -> Result<(), PersistError> {
        self.records
            .entry(record.entity)
            .or_default()
            .push(record.clone());
        Ok(())
    }
}
