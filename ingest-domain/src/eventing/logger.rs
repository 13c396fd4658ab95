//! 审计日志处理器（EventLogger）
//!
//! 通配订阅，将收到的每个事件序列化为 JSON 并写入日志。
//!
use crate::event::Event;
use crate::eventing::{EventHandler, HandledEventType};
use anyhow::Context;
use async_trait::async_trait;

#[derive(Debug, Default, Clone, Copy)]
pub struct EventLogger;

impl EventLogger {
    pub const NAME: &'static str = "event_logger";
}

#[async_trait]
impl EventHandler for EventLogger {
    fn handler_name(&self) -> &str {
        Self::NAME
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::All
    }

    async fn handle(&self, event: &Event) -> anyhow::Result<()> {
        let json = serde_json::to_string(event)
            .with_context(|| format!("serialize event {}", event.id()))?;
        tracing::info!(
            target: "ingest::audit",
            event_type = event.event_type(),
            event_id = event.id(),
            source = event.source(),
            priority = %event.priority(),
            event = %json,
            "event received"
        );
        Ok(())
    }
}
