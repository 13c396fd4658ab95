//! 事件计数处理器（EventMetrics）
//!
//! 通配订阅，按事件类型累计收到的事件数量。
//!
use crate::event::Event;
use crate::eventing::{EventHandler, HandledEventType};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct EventMetrics {
    counts: DashMap<String, u64>,
}

impl EventMetrics {
    pub const NAME: &'static str = "event_metrics";

    pub fn new() -> Self {
        Self::default()
    }

    /// 指定事件类型的累计数量
    pub fn count(&self, event_type: &str) -> u64 {
        self.counts.get(event_type).map(|c| *c).unwrap_or(0)
    }

    /// 所有类型的累计数量
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|entry| *entry.value()).sum()
    }

    /// 按类型排序的计数快照
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

#[async_trait]
impl EventHandler for EventMetrics {
    fn handler_name(&self) -> &str {
        Self::NAME
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::All
    }

    async fn handle(&self, event: &Event) -> anyhow::Result<()> {
        let total = {
            let mut count = self.counts.entry(event.event_type().to_string()).or_insert(0);
            *count += 1;
            *count
        };
        tracing::debug!(event_type = event.event_type(), total, "event metric updated");
        Ok(())
    }
}
