//! 归一化阶段
//!
//! 对每条原始记录做结构与类型的统一：
//! - 字段名去空白并转小写；
//! - 文本去首尾空白、折叠内部空白并转小写（`sku` 为标识符，转大写）；
//! - `fecha` 与 `fecha_*` 字段按 `YYYY-MM-DD` 解析为时间戳；
//! - 价格/数量类字段转为浮点数；
//! - `id` 与 `*_id` 字段转为整数；
//! - 嵌套映射（例如销售明细）按同样规则处理。
//!
//! 某个字段无法转换时只丢弃该字段并在记录上留下诊断，不会让批次失败。
//!
use crate::error::StageFailure;
use chrono::NaiveDate;
use ingest_domain::{ProcessedRecord, RawBatch, Record, RecordType, Value};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_FIELD: &str = "fecha";
const DATE_FIELD_PREFIX: &str = "fecha_";
const ID_FIELD: &str = "id";
const ID_FIELD_SUFFIX: &str = "_id";

/// 需要数值化的字段
pub const NUMERIC_FIELDS: &[&str] = &[
    "precio",
    "precio_oferta",
    "precio_unitario",
    "total",
    "subtotal",
    "impuestos",
    "descuento",
    "cantidad",
    "stock_actual",
    "stock_minimo",
];

/// 作为标识符处理的文本字段（统一为大写而非小写）
const IDENTIFIER_FIELDS: &[&str] = &["sku"];

pub fn normalize(batch: RawBatch) -> Result<Vec<ProcessedRecord>, StageFailure> {
    if batch.records.is_empty() {
        return Err(StageFailure::EmptyBatch);
    }

    let entity = batch.record_type;
    tracing::debug!(records = batch.records.len(), "normalizing records");
    Ok(batch
        .records
        .into_iter()
        .map(|raw| normalize_record(entity, raw))
        .collect())
}

pub fn normalize_record(entity: RecordType, raw: Record) -> ProcessedRecord {
    let mut errors = Vec::new();
    let data = normalize_fields(raw, "", &mut errors);
    let mut out = ProcessedRecord::new(entity, data);
    out.errors = errors;
    out
}

/// 归一化一层字段；嵌套的映射（如 `detalles_venta` 的明细项）按同样规则递归处理，
/// 诊断中的字段路径形如 `detalles_venta[0].cantidad`
fn normalize_fields(raw: Record, prefix: &str, errors: &mut Vec<String>) -> Record {
    let mut out = Record::new();
    for (key, value) in raw {
        let key = normalize_key(&key);
        let path = format!("{prefix}{key}");
        match coerce_field(&key, value, &path, errors) {
            Ok(value) => {
                if out.insert(key, value).is_some() {
                    errors.push(format!(
                        "field '{path}' appears more than once after key folding"
                    ));
                }
            }
            Err(reason) => errors.push(format!("field '{path}' dropped: {reason}")),
        }
    }
    out
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn is_date_field(key: &str) -> bool {
    key == DATE_FIELD || key.starts_with(DATE_FIELD_PREFIX)
}

fn is_id_field(key: &str) -> bool {
    key == ID_FIELD || key.ends_with(ID_FIELD_SUFFIX)
}

fn coerce_field(
    key: &str,
    value: Value,
    path: &str,
    errors: &mut Vec<String>,
) -> Result<Value, String> {
    if is_date_field(key) {
        return coerce_date(value);
    }
    if NUMERIC_FIELDS.contains(&key) {
        return coerce_number(value);
    }
    if is_id_field(key) {
        return coerce_id(value);
    }
    if IDENTIFIER_FIELDS.contains(&key) {
        return Ok(match value {
            Value::Text(s) => Value::Text(s.trim().to_uppercase()),
            other => other,
        });
    }
    Ok(normalize_value(value, path, errors))
}

fn coerce_date(value: Value) -> Result<Value, String> {
    match value {
        Value::Timestamp(t) => Ok(Value::Timestamp(t)),
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Value::Timestamp(dt.and_utc()))
            .ok_or_else(|| format!("'{s}' is not a {DATE_FORMAT} date")),
        other => Err(format!("expected a date, found {other}")),
    }
}

fn coerce_number(value: Value) -> Result<Value, String> {
    let number = match &value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Text(s) => parse_decimal(s),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => Ok(Value::Float(n)),
        _ => Err(format!("'{value}' is not a number")),
    }
}

/// 标识符统一为整数；`"3"` 与 `3.0` 都得到 `3`
fn coerce_id(value: Value) -> Result<Value, String> {
    let id = match &value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        Value::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    id.map(Value::Integer)
        .ok_or_else(|| format!("'{value}' is not an integer id"))
}

/// 接受 `,` 作为小数分隔符（例如 `"10,5"`）
fn parse_decimal(s: &str) -> Option<f64> {
    let s = s.trim();
    s.parse::<f64>()
        .ok()
        .or_else(|| s.replace(',', ".").parse::<f64>().ok())
}

fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 递归归一化；映射内的字段走与顶层相同的转换
fn normalize_value(value: Value, path: &str, errors: &mut Vec<String>) -> Value {
    match value {
        Value::Text(s) => Value::Text(normalize_text(&s)),
        Value::List(items) => Value::List(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| normalize_value(item, &format!("{path}[{i}]"), errors))
                .collect(),
        ),
        Value::Map(map) => Value::Map(normalize_fields(map, &format!("{path}."), errors)),
        other => other,
    }
}
