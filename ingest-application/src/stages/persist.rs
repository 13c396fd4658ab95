//! 持久化阶段
//!
//! 对每条记录调用一次持久化接口。单条失败只记录告警并计数，
//! 不会中止批次。
//!
use crate::record_persister::RecordPersister;
use futures_util::{StreamExt, stream};
use ingest_domain::ProcessedRecord;
use serde::Serialize;

/// 持久化结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub async fn persist(
    records: Vec<ProcessedRecord>,
    persister: &dyn RecordPersister,
    concurrency: usize,
) -> PersistReport {
    let attempted = records.len();
    let outcomes: Vec<bool> = stream::iter(records)
        .map(|record| async move {
            match persister.persist(&record).await {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(entity = %record.entity, error = %err, "record not persisted");
                    false
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let succeeded = outcomes.into_iter().filter(|ok| *ok).count();
    PersistReport {
        attempted,
        succeeded,
        failed: attempted - succeeded,
    }
}
