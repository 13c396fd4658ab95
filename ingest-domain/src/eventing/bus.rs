//! 事件总线（EventBus）协议
//!
//! 订阅表按事件类型分桶，通配订阅（`*`）单独成桶：
//! - 发布时合并“精确类型桶 + 通配桶”，两者都会收到事件；
//! - 退订只作用于指定的桶，通配与精确订阅互不影响；
//! - 分发失败以 `DispatchError` 聚合返回，调用方可仅记录而不中断自身流程。
//!
use crate::error::DispatchError;
use crate::event::Event;
use crate::eventing::EventHandler;
use async_trait::async_trait;
use std::sync::Arc;

/// 事件总线：负责登记处理器并分发事件
#[async_trait]
pub trait EventBus: Send + Sync {
    /// 将处理器登记到 `event_type` 桶，`"*"` 表示通配
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// 从 `event_type` 桶中移除该处理器实例的第一条登记；不存在时返回 `false`
    fn unsubscribe(&self, event_type: &str, handler: &Arc<dyn EventHandler>) -> bool;

    /// 分发事件并等待所有匹配的处理器完成
    async fn publish(&self, event: &Event) -> Result<(), DispatchError>;

    /// 按处理器自身声明的事件类型进行登记
    fn register(&self, handler: Arc<dyn EventHandler>) {
        for key in handler.handled_event_type().subscription_keys() {
            self.subscribe(&key, handler.clone());
        }
    }
}
