//! 批处理器（BatchProcessor）
//!
//! 串联五个阶段并在生命周期节点发布事件：
//! - 归一化之前：`datos_recolectados`；
//! - 全部阶段完成后：`datos_procesados`，随后 `datos_persistidos`；
//! - 阶段级故障：`error.<kind>`（高优先级），并返回 `StageError`。
//!
//! 事件发布失败（观察者出错）只记录告警，不影响批次结果。
//!
use crate::config::ProcessorConfig;
use crate::error::{Stage, StageError, StageFailure};
use crate::product_lookup::ProductLookup;
use crate::record_persister::RecordPersister;
use crate::stages::{self, PersistReport};
use bon::Builder;
use ingest_domain::event::kinds::{self, keys};
use ingest_domain::eventing::EventBus;
use ingest_domain::{Event, Priority, RawBatch, Record, RecordType, Value, record};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Builder)]
pub struct BatchProcessor {
    event_bus: Arc<dyn EventBus>,
    product_lookup: Arc<dyn ProductLookup>,
    record_persister: Arc<dyn RecordPersister>,
    #[builder(default)]
    config: ProcessorConfig,
}

/// 单个批次的公共上下文，用于组装事件载荷
struct BatchContext {
    batch_id: String,
    origin: String,
    record_type: RecordType,
    branch_id: u64,
}

impl BatchContext {
    fn base(&self) -> Record {
        record([
            (keys::ORIGIN, Value::from(self.origin.as_str())),
            (keys::BRANCH_ID, Value::from(self.branch_id)),
            (keys::BATCH_ID, Value::from(self.batch_id.as_str())),
        ])
    }
}

impl BatchProcessor {
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<dyn EventBus> {
        &self.event_bus
    }

    pub async fn process_batch(&self, raw: RawBatch) -> Result<(), StageError> {
        self.process_batch_with_cancel(raw, &CancellationToken::new())
            .await
    }

    /// 处理一个批次；每个阶段开始前检查取消令牌
    #[tracing::instrument(
        name = "process_batch",
        skip_all,
        fields(
            batch_id = %raw.batch_id,
            origin = %raw.origin,
            record_type = %raw.record_type,
            branch_id = raw.branch_id
        )
    )]
    pub async fn process_batch_with_cancel(
        &self,
        raw: RawBatch,
        cancel: &CancellationToken,
    ) -> Result<(), StageError> {
        let ctx = BatchContext {
            batch_id: raw.batch_id.clone(),
            origin: raw.origin.clone(),
            record_type: raw.record_type,
            branch_id: raw.branch_id,
        };
        let initial = raw.len();

        let mut collected = ctx.base();
        collected.insert(keys::RECORD_TYPE.into(), Value::from(ctx.record_type.as_str()));
        collected.insert(keys::COUNT.into(), Value::from(initial));
        self.emit(Event::new(kinds::DATA_COLLECTED, collected, &self.config.source))
            .await;

        let result = self.run_stages(raw, cancel).await;
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                self.emit_failure(&ctx, &err).await;
                return Err(err);
            }
        };

        let mut processed = ctx.base();
        processed.insert(keys::RECORD_TYPE.into(), Value::from(ctx.record_type.as_str()));
        processed.insert(keys::INITIAL_COUNT.into(), Value::from(initial));
        processed.insert(keys::FINAL_COUNT.into(), Value::from(report.attempted));
        self.emit(Event::new(kinds::DATA_PROCESSED, processed, &self.config.source))
            .await;

        let mut persisted = record([
            (keys::PERSISTED_COUNT, report.attempted),
            (keys::SUCCEEDED_COUNT, report.succeeded),
            (keys::FAILED_COUNT, report.failed),
        ]);
        persisted.insert(keys::BRANCH_ID.into(), Value::from(ctx.branch_id));
        persisted.insert(keys::BATCH_ID.into(), Value::from(ctx.batch_id.as_str()));
        self.emit(Event::new(kinds::DATA_PERSISTED, persisted, &self.config.source))
            .await;

        tracing::info!(
            initial,
            final_count = report.attempted,
            persisted = report.succeeded,
            "batch processed"
        );
        Ok(())
    }

    async fn run_stages(
        &self,
        raw: RawBatch,
        cancel: &CancellationToken,
    ) -> Result<PersistReport, StageError> {
        checkpoint(Stage::Normalize, cancel)?;
        let records =
            stages::normalize(raw).map_err(|cause| StageError::new(Stage::Normalize, cause))?;

        checkpoint(Stage::Validate, cancel)?;
        let records = stages::validate(records);

        checkpoint(Stage::Enrich, cancel)?;
        let records = stages::enrich(
            records,
            self.product_lookup.as_ref(),
            self.config.enrich_concurrency,
        )
        .await;

        checkpoint(Stage::Deduplicate, cancel)?;
        let records = stages::deduplicate(records);

        checkpoint(Stage::Persist, cancel)?;
        Ok(stages::persist(
            records,
            self.record_persister.as_ref(),
            self.config.persist_concurrency,
        )
        .await)
    }

    async fn emit_failure(&self, ctx: &BatchContext, err: &StageError) {
        tracing::error!(stage = %err.stage, error = %err, "batch aborted");

        let mut data = ctx.base();
        data.insert(
            keys::ERROR_KIND.into(),
            Value::from(format!("error_{}", err.stage.error_kind())),
        );
        data.insert(keys::STAGE.into(), Value::from(err.stage.name()));
        data.insert(keys::MESSAGE.into(), Value::from(err.to_string()));
        let event = Event::new(err.stage.error_event_type(), data, &self.config.source)
            .with_priority(Priority::High);
        self.emit(event).await;
    }

    /// 发布事件；观察者失败只记录告警
    async fn emit(&self, event: Event) {
        if let Err(err) = self.event_bus.publish(&event).await {
            tracing::warn!(
                event_type = event.event_type(),
                error = %err,
                "event observers failed"
            );
        }
    }
}

fn checkpoint(stage: Stage, cancel: &CancellationToken) -> Result<(), StageError> {
    if cancel.is_cancelled() {
        return Err(StageError::new(stage, StageFailure::Cancelled));
    }
    tracing::debug!(%stage, "stage started");
    Ok(())
}
