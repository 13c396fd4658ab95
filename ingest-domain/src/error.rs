//! 领域层统一错误定义
//!
//! 包含值/报表构建错误（`DomainError`），以及事件分发的处理器错误
//! （`HandlerError`）与聚合错误（`DispatchError`）。
//!
use std::fmt;
use thiserror::Error;

/// 统一错误类型（领域层最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("parse error: {reason}")]
    Parse { reason: String },
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
}

impl DomainError {
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        DomainError::InvalidValue {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

/// 单个处理器在一次分发中的失败（返回错误或 panic）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("handler={handler}, reason={reason}")]
pub struct HandlerError {
    pub handler: String,
    pub reason: String,
}

impl HandlerError {
    pub fn new(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            reason: reason.into(),
        }
    }
}

/// 一次 `publish` 中所有失败处理器的聚合错误
#[derive(Debug, Clone, Error)]
pub struct DispatchError {
    pub event_id: String,
    pub event_type: String,
    pub errors: Vec<HandlerError>,
}

impl DispatchError {
    /// 是否包含指定处理器的失败记录
    pub fn contains(&self, handler: &str) -> bool {
        self.errors.iter().any(|e| e.handler == handler)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dispatch failed: type={}, id={}, failed_handlers={} [",
            self.event_type,
            self.event_id,
            self.errors.len()
        )?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        f.write_str("]")
    }
}
