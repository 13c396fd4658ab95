//! 去重阶段
//!
//! 以记录 `data` 的规范化序列化（键有序）为唯一键，保留首次出现的记录。
//!
use ingest_domain::ProcessedRecord;
use std::collections::HashSet;

pub fn uniqueness_key(record: &ProcessedRecord) -> String {
    serde_json::to_string(&record.data).unwrap_or_else(|_| format!("{:?}", record.data))
}

pub fn deduplicate(records: Vec<ProcessedRecord>) -> Vec<ProcessedRecord> {
    let total = records.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<ProcessedRecord> = records
        .into_iter()
        .filter(|record| seen.insert(uniqueness_key(record)))
        .collect();

    if unique.len() < total {
        tracing::debug!(removed = total - unique.len(), "duplicate records removed");
    }
    unique
}
