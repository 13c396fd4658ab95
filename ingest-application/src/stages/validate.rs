//! 校验阶段
//!
//! 按记录类型检查必填字段与数值范围。未通过的记录被剔除（非致命），
//! 通过的记录标记 `validated = true`。
//!
use super::normalize::NUMERIC_FIELDS;
use ingest_domain::{ProcessedRecord, Record, RecordType, Value};

pub fn validate(records: Vec<ProcessedRecord>) -> Vec<ProcessedRecord> {
    let total = records.len();
    let kept: Vec<ProcessedRecord> = records
        .into_iter()
        .filter_map(|mut record| match check(&record) {
            Ok(()) => {
                record.validated = true;
                Some(record)
            }
            Err(reason) => {
                tracing::debug!(entity = %record.entity, %reason, "record rejected");
                None
            }
        })
        .collect();

    if kept.len() < total {
        tracing::info!(
            rejected = total - kept.len(),
            kept = kept.len(),
            "validation dropped records"
        );
    }
    kept
}

/// 检查单条记录，返回第一条不满足的规则
pub fn check(record: &ProcessedRecord) -> Result<(), String> {
    if let Some(path) = negative_amount(&record.data, "") {
        return Err(format!("'{path}' must not be negative"));
    }

    match record.entity {
        RecordType::Producto => {
            require_text(record, "sku")?;
            require_text(record, "nombre")
        }
        RecordType::Venta => {
            match record.get("sucursal_id").and_then(Value::as_f64) {
                Some(id) if id > 0.0 => {}
                _ => return Err("'sucursal_id' must be a positive number".to_string()),
            }
            if record
                .get("fecha_venta")
                .and_then(Value::as_timestamp)
                .is_none()
            {
                return Err("'fecha_venta' must be a date".to_string());
            }
            let has_details = record
                .get("detalles_venta")
                .and_then(Value::as_list)
                .is_some_and(|items| !items.is_empty());
            if has_details || record.number("total").is_some() {
                Ok(())
            } else {
                Err("sale needs 'detalles_venta' or 'total'".to_string())
            }
        }
        RecordType::Cliente => {
            require_text(record, "nombre")?;
            require_text(record, "email")
                .or_else(|_| require_text(record, "telefono"))
                .map_err(|_| "client needs 'email' or 'telefono'".to_string())
        }
        RecordType::Stock => {
            require_text(record, "sku")?;
            if record.number("stock_actual").is_some() || record.number("cantidad").is_some() {
                Ok(())
            } else {
                Err("stock needs 'stock_actual' or 'cantidad'".to_string())
            }
        }
    }
}

/// 查找第一个为负的数值字段，包括明细项等嵌套映射中的字段
fn negative_amount(data: &Record, prefix: &str) -> Option<String> {
    data.iter().find_map(|(key, value)| {
        let path = format!("{prefix}{key}");
        if NUMERIC_FIELDS.contains(&key.as_str()) {
            return value.as_f64().filter(|n| *n < 0.0).map(|_| path);
        }
        nested_negative(value, &path)
    })
}

fn nested_negative(value: &Value, path: &str) -> Option<String> {
    match value {
        Value::Map(map) => negative_amount(map, &format!("{path}.")),
        Value::List(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, item)| nested_negative(item, &format!("{path}[{i}]"))),
        _ => None,
    }
}

fn require_text(record: &ProcessedRecord, field: &str) -> Result<(), String> {
    match record.text(field) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(format!("'{field}' is required")),
    }
}
