//! 事件处理器（EventHandler）
//!
//! 定义消费某类/多类/全部事件的处理逻辑与元信息（名称、订阅类型）。
//!
use crate::event::{Event, kinds::WILDCARD};
use async_trait::async_trait;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandledEventType {
    One(String),
    Many(Vec<String>),
    All,
}

impl HandledEventType {
    /// 展开为订阅时使用的事件类型键，`All` 对应通配键 `*`
    pub fn subscription_keys(&self) -> Vec<String> {
        match self {
            HandledEventType::One(t) => vec![t.clone()],
            HandledEventType::Many(ts) => ts.clone(),
            HandledEventType::All => vec![WILDCARD.to_string()],
        }
    }
}

/// 事件处理器：处理某一类型的事件
///
/// 处理器拿到的是事件的只读引用；失败（返回错误或 panic）由总线收集，
/// 不会影响同一事件的其他处理器。
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// 处理器名称（用于失败聚合与日志）
    fn handler_name(&self) -> &str;
    /// 返回该处理器声明的事件类型
    fn handled_event_type(&self) -> HandledEventType;
    /// 处理事件
    async fn handle(&self, event: &Event) -> anyhow::Result<()>;
}
