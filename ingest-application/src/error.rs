use ingest_domain::event::kinds;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Normalize,
    Validate,
    Enrich,
    Deduplicate,
    Persist,
}

impl Stage {
    /// 执行顺序
    pub const ORDER: [Stage; 5] = [
        Stage::Normalize,
        Stage::Validate,
        Stage::Enrich,
        Stage::Deduplicate,
        Stage::Persist,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Validate => "validate",
            Stage::Enrich => "enrich",
            Stage::Deduplicate => "deduplicate",
            Stage::Persist => "persist",
        }
    }

    /// 错误事件的种类标签（`error.<kind>`）
    pub fn error_kind(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalizacion",
            Stage::Validate => "validacion",
            Stage::Enrich => "enriquecimiento",
            Stage::Deduplicate => "deduplicacion",
            Stage::Persist => "persistencia",
        }
    }

    pub fn error_event_type(&self) -> String {
        kinds::error_type(self.error_kind())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 导致整个批次中止的阶段级故障
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageFailure {
    #[error("batch contains no records")]
    EmptyBatch,
    #[error("processing cancelled")]
    Cancelled,
}

/// 批次级错误：标明失败阶段与原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stage {stage} failed: {cause}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub cause: StageFailure,
}

impl StageError {
    pub fn new(stage: Stage, cause: StageFailure) -> Self {
        Self { stage, cause }
    }
}

/// 商品信息查询失败（对流水线非致命）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("product not found: sku={sku}")]
    NotFound { sku: String },
    #[error("lookup transport error: {reason}")]
    Transport { reason: String },
    #[error("invalid lookup response: {reason}")]
    InvalidResponse { reason: String },
}

/// 单条记录持久化失败（对流水线非致命）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("record rejected: {reason}")]
    Rejected { reason: String },
}
