//! 事件（Event）
//!
//! 描述系统中已发生的事实：类型、载荷、时间戳、来源与优先级。
//! 事件创建后不可变，处理器只能拿到只读引用。

pub mod kinds;
mod priority;

pub use priority::Priority;

use crate::value::{Record, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// 进程内唯一标识：`<source>_<ULID>`（毫秒时间戳 + 80 位随机数）
    id: String,
    /// 事件类型
    #[serde(rename = "type")]
    event_type: String,
    /// 事件载荷，结构由事件类型约定，总线不做校验
    data: Record,
    /// 创建时间
    timestamp: DateTime<Utc>,
    /// 产生事件的组件
    source: String,
    priority: Priority,
}

impl Event {
    pub fn new(event_type: impl Into<String>, data: Record, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: format!("{source}_{}", Ulid::new()),
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
            source,
            priority: Priority::default(),
        }
    }

    /// 在发布前设置优先级
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn data(&self) -> &Record {
        &self.data
    }

    /// 读取单个载荷字段
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}
