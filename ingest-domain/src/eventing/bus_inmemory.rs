//! 内存版事件总线（InMemoryEventBus）
//!
//! 基于 `DashMap` 的分片订阅表实现 `EventBus` 协议：
//! - 查找只在对应桶上加读锁，并发的 `publish` 互不阻塞；
//! - `subscribe`/`unsubscribe` 仅独占所操作的桶；
//! - 锁在任何处理器运行之前释放。
//!
//! 分发时每个处理器在独立的 tokio 任务中执行，全部 join 后才返回；
//! 处理器返回的错误与 panic 都会被转换为 `HandlerError` 并聚合。
//!
use crate::error::{DispatchError, HandlerError};
use crate::event::{Event, kinds::WILDCARD};
use crate::eventing::{EventBus, EventHandler};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::future::join_all;
use std::any::Any;
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinError, JoinHandle};

/// 进程内事件总线
#[derive(Default)]
pub struct InMemoryEventBus {
    buckets: DashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定桶中的登记数量（`"*"` 为通配桶）
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.buckets.get(event_type).map(|l| l.len()).unwrap_or(0)
    }

    /// 合并精确类型桶与通配桶；类型本身为 `*` 时只取通配桶一次
    fn matching(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        let mut merged: Vec<Arc<dyn EventHandler>> = Vec::new();
        if event_type != WILDCARD {
            if let Some(list) = self.buckets.get(event_type) {
                merged.extend(list.iter().cloned());
            }
        }
        if let Some(list) = self.buckets.get(WILDCARD) {
            merged.extend(list.iter().cloned());
        }
        merged
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        tracing::debug!(
            event_type,
            handler = handler.handler_name(),
            "handler subscribed"
        );
        self.buckets
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    fn unsubscribe(&self, event_type: &str, handler: &Arc<dyn EventHandler>) -> bool {
        let removed = match self.buckets.get_mut(event_type) {
            Some(mut list) => match list.iter().position(|h| Arc::ptr_eq(h, handler)) {
                Some(pos) => {
                    list.remove(pos);
                    true
                }
                None => false,
            },
            None => false,
        };

        if removed {
            self.buckets.remove_if(event_type, |_, list| list.is_empty());
            tracing::debug!(
                event_type,
                handler = handler.handler_name(),
                "handler unsubscribed"
            );
        }
        removed
    }

    async fn publish(&self, event: &Event) -> Result<(), DispatchError> {
        let handlers = self.matching(event.event_type());
        if handlers.is_empty() {
            tracing::debug!(
                event_type = event.event_type(),
                "no handlers registered for event"
            );
            return Ok(());
        }

        tracing::debug!(
            event_type = event.event_type(),
            event_id = event.id(),
            handlers = handlers.len(),
            "publishing event"
        );

        let shared = Arc::new(event.clone());
        let tasks: Vec<(String, JoinHandle<anyhow::Result<()>>)> = handlers
            .into_iter()
            .map(|handler| {
                let event = shared.clone();
                let name = handler.handler_name().to_string();
                (name, tokio::spawn(async move { handler.handle(&event).await }))
            })
            .collect();
        // 调用方放弃等待（publish 的 future 被丢弃）时，中止仍在运行的处理器
        let _guard = AbortOnDrop(tasks.iter().map(|(_, t)| t.abort_handle()).collect());

        let joined = tasks
            .into_iter()
            .map(|(name, task)| async move { (name, task.await) });
        let errors: Vec<HandlerError> = join_all(joined)
            .await
            .into_iter()
            .filter_map(|(name, outcome)| match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(HandlerError::new(name, format!("{err:#}"))),
                Err(join_err) => Some(HandlerError::new(name, describe_join_error(join_err))),
            })
            .collect();

        if errors.is_empty() {
            return Ok(());
        }

        let err = DispatchError {
            event_id: event.id().to_string(),
            event_type: event.event_type().to_string(),
            errors,
        };
        tracing::warn!(error = %err, "event handlers failed");
        Err(err)
    }
}

struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        format!("panicked: {}", panic_message(err.into_panic()))
    } else {
        "handler task cancelled".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
