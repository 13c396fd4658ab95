//! 流水线事件的观察者
//!
//! - `StageLogHandler`：为三个生命周期事件输出可读的运行日志；
//! - `ReportCollector`：根据 `datos_procesados` 生成处理报表，按批次 ID 保留最近若干份。

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use ingest_domain::Event;
use ingest_domain::event::kinds::{self, keys};
use ingest_domain::eventing::{EventHandler, HandledEventType};
use ingest_domain::report::Report;
use std::collections::VecDeque;
use std::sync::RwLock;

pub const PROCESSING_REPORT_KIND: &str = "reporte_procesamiento";
const RETAINED_REPORTS: usize = 64;

pub struct StageLogHandler;

#[async_trait]
impl EventHandler for StageLogHandler {
    fn handler_name(&self) -> &str {
        "stage_log"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::Many(vec![
            kinds::DATA_COLLECTED.to_string(),
            kinds::DATA_PROCESSED.to_string(),
            kinds::DATA_PERSISTED.to_string(),
        ])
    }

    async fn handle(&self, event: &Event) -> AnyResult<()> {
        let field = |key: &str| {
            event
                .get(key)
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        };

        match event.event_type() {
            kinds::DATA_COLLECTED => tracing::info!(
                origin = %field(keys::ORIGIN),
                record_type = %field(keys::RECORD_TYPE),
                count = %field(keys::COUNT),
                "data collected"
            ),
            kinds::DATA_PROCESSED => tracing::info!(
                origin = %field(keys::ORIGIN),
                initial = %field(keys::INITIAL_COUNT),
                final_count = %field(keys::FINAL_COUNT),
                "data processed"
            ),
            kinds::DATA_PERSISTED => tracing::info!(
                persisted = %field(keys::PERSISTED_COUNT),
                failed = %field(keys::FAILED_COUNT),
                "data persisted"
            ),
            other => tracing::debug!(event_type = other, "ignored event"),
        }
        Ok(())
    }
}

/// 每个批次的 `datos_procesados` 对应一份处理报表
#[derive(Default)]
pub struct ReportCollector {
    recent: RwLock<VecDeque<(String, Report)>>,
}

impl ReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Report> {
        let recent = self.recent.read().ok()?;
        recent.back().map(|(_, report)| report.clone())
    }

    /// 指定批次的报表；并发批次互不干扰
    pub fn for_batch(&self, batch_id: &str) -> Option<Report> {
        let recent = self.recent.read().ok()?;
        recent
            .iter()
            .rev()
            .find(|(id, _)| id == batch_id)
            .map(|(_, report)| report.clone())
    }
}

#[async_trait]
impl EventHandler for ReportCollector {
    fn handler_name(&self) -> &str {
        "report_collector"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::One(kinds::DATA_PROCESSED.to_string())
    }

    async fn handle(&self, event: &Event) -> AnyResult<()> {
        let branch_id = event
            .get(keys::BRANCH_ID)
            .and_then(|v| v.as_f64())
            .map(|id| id as u64);
        let batch_id = event
            .get(keys::BATCH_ID)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let report = Report::builder()
            .kind(PROCESSING_REPORT_KIND)
            .maybe_branch_id(branch_id)
            .to(event.timestamp())
            .data(event.data().clone())
            .status("completado")
            .build()?;

        let mut recent = self
            .recent
            .write()
            .map_err(|_| anyhow::anyhow!("report slot poisoned"))?;
        if recent.len() == RETAINED_REPORTS {
            recent.pop_front();
        }
        recent.push_back((batch_id, report));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_domain::{Value, record};

    #[tokio::test]
    async fn collector_keeps_latest_processing_report() {
        let collector = ReportCollector::new();
        assert!(collector.latest().is_none());

        for n in [1_i64, 2] {
            let ev = Event::new(
                kinds::DATA_PROCESSED,
                record([
                    (keys::FINAL_COUNT, Value::Integer(n)),
                    (keys::BRANCH_ID, Value::Integer(7)),
                ]),
                "t",
            );
            collector.handle(&ev).await.unwrap();
        }

        let report = collector.latest().unwrap();
        assert_eq!(report.kind(), PROCESSING_REPORT_KIND);
        assert_eq!(report.branch_id(), Some(7));
        assert_eq!(report.status(), "completado");
        assert_eq!(report.get(keys::FINAL_COUNT), Some(&Value::Integer(2)));
    }

    fn processed(batch_id: &str, n: i64) -> Event {
        Event::new(
            kinds::DATA_PROCESSED,
            record([
                (keys::BATCH_ID, Value::from(batch_id)),
                (keys::FINAL_COUNT, Value::Integer(n)),
            ]),
            "t",
        )
    }

    #[tokio::test]
    async fn collector_finds_report_by_batch() {
        let collector = ReportCollector::new();
        collector.handle(&processed("lote_a", 1)).await.unwrap();
        collector.handle(&processed("lote_b", 2)).await.unwrap();

        let a = collector.for_batch("lote_a").unwrap();
        assert_eq!(a.get(keys::FINAL_COUNT), Some(&Value::Integer(1)));
        assert_eq!(
            collector.latest().unwrap().get(keys::FINAL_COUNT),
            Some(&Value::Integer(2))
        );
        assert!(collector.for_batch("lote_c").is_none());
    }

    #[tokio::test]
    async fn collector_retention_is_bounded() {
        let collector = ReportCollector::new();
        for n in 0..(RETAINED_REPORTS as i64 + 1) {
            collector.handle(&processed(&format!("lote_{n}"), n)).await.unwrap();
        }

        assert!(collector.for_batch("lote_0").is_none());
        assert!(collector.for_batch("lote_1").is_some());
        assert_eq!(collector.recent.read().unwrap().len(), RETAINED_REPORTS);
    }

    #[tokio::test]
    async fn stage_log_accepts_lifecycle_events() {
        let handler = StageLogHandler;
        assert_eq!(handler.handled_event_type().subscription_keys().len(), 3);
        let ev = Event::new(kinds::DATA_PERSISTED, record([(keys::PERSISTED_COUNT, 1_i64)]), "t");
        assert!(handler.handle(&ev).await.is_ok());
    }
}
