//! 批次模型
//!
//! - `RawBatch`：调用方提交的一批原始记录（同一来源、类型与分支）；
//! - `ProcessedRecord`：流水线中流转的记录，携带自身的校验诊断与富化标记。
//!
//! JSON 字段名沿用既有接口（origen、tipo、datos ...）。
//!
use crate::error::DomainError;
use crate::value::{Record, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// 记录类型（决定校验规则）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Cliente,
    Venta,
    Producto,
    Stock,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [
        RecordType::Cliente,
        RecordType::Venta,
        RecordType::Producto,
        RecordType::Stock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Cliente => "cliente",
            RecordType::Venta => "venta",
            RecordType::Producto => "producto",
            RecordType::Stock => "stock",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::Parse {
                reason: format!("unknown record type: {s}"),
            })
    }
}

/// 原始批次（DatosCrudos）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBatch {
    #[serde(rename = "origen")]
    pub origin: String,
    #[serde(rename = "tipo")]
    pub record_type: RecordType,
    #[serde(rename = "datos", default)]
    pub records: Vec<Record>,
    #[serde(rename = "timestamp", default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
    #[serde(rename = "sucursal_id", default)]
    pub branch_id: u64,
    /// 批次关联 ID；调用方未提供时自动生成，贯穿该批次的全部事件
    #[serde(rename = "lote_id", default = "new_batch_id")]
    pub batch_id: String,
}

fn new_batch_id() -> String {
    format!("lote_{}", Ulid::new())
}

impl RawBatch {
    pub fn new(
        origin: impl Into<String>,
        record_type: RecordType,
        records: Vec<Record>,
        branch_id: u64,
    ) -> Self {
        Self {
            origin: origin.into(),
            record_type,
            records,
            captured_at: Utc::now(),
            branch_id,
            batch_id: new_batch_id(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 处理后的记录（RegistroProcesado）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    #[serde(rename = "entidad")]
    pub entity: RecordType,
    #[serde(rename = "datos")]
    pub data: Record,
    #[serde(rename = "validado")]
    pub validated: bool,
    /// 记录级诊断（例如归一化时丢弃的字段），按产生顺序
    #[serde(rename = "errores", default)]
    pub errors: Vec<String>,
    #[serde(rename = "enriquecido")]
    pub enriched: bool,
}

impl ProcessedRecord {
    pub fn new(entity: RecordType, data: Record) -> Self {
        Self {
            entity,
            data,
            validated: false,
            errors: Vec::new(),
            enriched: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// 文本字段视图
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// 数值字段视图
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }
}
