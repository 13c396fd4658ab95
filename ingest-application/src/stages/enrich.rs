//! 富化阶段
//!
//! 对带 `sku` 的记录查询商品信息并合并进记录（查询结果覆盖同名字段）。
//! 查询失败只记录告警，记录保持未富化继续流转。
//!
//! 每条记录都会写入 `enriquecido_en` 与 `fuente_enriquecimiento`；
//! 时间戳在一次阶段执行内只取一次，同一批次内的重复记录因此仍然完全相同。
//!
use crate::product_lookup::ProductLookup;
use chrono::Utc;
use futures_util::{StreamExt, stream};
use ingest_domain::{ProcessedRecord, Value};

pub const ENRICHED_AT: &str = "enriquecido_en";
pub const ENRICHMENT_SOURCE: &str = "fuente_enriquecimiento";

pub async fn enrich(
    records: Vec<ProcessedRecord>,
    lookup: &dyn ProductLookup,
    concurrency: usize,
) -> Vec<ProcessedRecord> {
    let enriched_at = Utc::now();
    let source = lookup.source_tag().to_string();

    stream::iter(records)
        .map(|record| enrich_one(record, lookup))
        .buffered(concurrency.max(1))
        .map(|mut record| {
            record
                .data
                .insert(ENRICHED_AT.to_string(), Value::Timestamp(enriched_at));
            record
                .data
                .insert(ENRICHMENT_SOURCE.to_string(), Value::from(source.as_str()));
            record
        })
        .collect()
        .await
}

async fn enrich_one(mut record: ProcessedRecord, lookup: &dyn ProductLookup) -> ProcessedRecord {
    let Some(sku) = record.text("sku").map(str::to_string) else {
        return record;
    };

    match lookup.lookup(&sku).await {
        Ok(info) => {
            record.enriched = !info.is_empty();
            record.data.extend(info);
        }
        Err(err) => {
            tracing::warn!(%sku, error = %err, "product lookup failed, record left unenriched");
        }
    }
    record
}
