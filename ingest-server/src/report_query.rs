//! 按需生成的业务报表
//!
//! `GET /api/reporte?tipo=...` 支持三种预设：
//! - `ventas_por_sucursal`：区间内的销售（按 `fecha_venta` 过滤）；
//! - `stock_actual`：库存大于零的商品；
//! - `clientes_potenciales`：区间内采集的客户（无 `fecha_captura` 的记录一并计入）。
//!
//! 报表内容取自已持久化的记录，并按分支过滤。

use chrono::{DateTime, Duration, NaiveDate, Utc};
use ingest_application::InMemoryRecordStore;
use ingest_domain::error::DomainError;
use ingest_domain::report::Report;
use ingest_domain::{ProcessedRecord, Record, RecordType, Value, record};
use serde::Deserialize;
use thiserror::Error;

pub const SALES_BY_BRANCH: &str = "ventas_por_sucursal";
pub const CURRENT_STOCK: &str = "stock_actual";
pub const POTENTIAL_CLIENTS: &str = "clientes_potenciales";

const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_RANGE_DAYS: i64 = 30;

/// `/api/reporte` 的查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub tipo: Option<String>,
    pub sucursal_id: Option<u64>,
    pub desde: Option<String>,
    pub hasta: Option<String>,
}

#[derive(Debug, Error)]
pub enum ReportQueryError {
    #[error("unknown report type: {0}")]
    UnknownKind(String),
    #[error("'sucursal_id' is required")]
    MissingBranch,
    #[error("'{field}' must be a YYYY-MM-DD date, got '{value}'")]
    BadDate { field: &'static str, value: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// 生成 `kind` 对应的报表；`hasta` 缺省为当前时间，`desde` 缺省为其前 30 天
pub fn build(
    kind: &str,
    query: &ReportQuery,
    store: &InMemoryRecordStore,
) -> Result<Report, ReportQueryError> {
    let branch = query.sucursal_id.ok_or(ReportQueryError::MissingBranch)?;
    let to = match &query.hasta {
        Some(s) => end_of_day(parse_date("hasta", s)?),
        None => Utc::now(),
    };
    let from = match &query.desde {
        Some(s) => start_of_day(parse_date("desde", s)?),
        None => to - Duration::days(DEFAULT_RANGE_DAYS),
    };

    let (report, entity) = match kind {
        SALES_BY_BRANCH => (Report::sales_by_branch(branch, from, to)?, RecordType::Venta),
        CURRENT_STOCK => (Report::current_stock(branch)?, RecordType::Stock),
        POTENTIAL_CLIENTS => (
            Report::potential_clients(branch, from, to)?,
            RecordType::Cliente,
        ),
        other => return Err(ReportQueryError::UnknownKind(other.to_string())),
    };

    let rows: Vec<Value> = store
        .records(entity)
        .into_iter()
        .filter(|r| in_branch(r, branch))
        .filter(|r| match kind {
            SALES_BY_BRANCH => dated_within(r, "fecha_venta", from, to).unwrap_or(false),
            CURRENT_STOCK => r
                .number("stock_actual")
                .or_else(|| r.number("cantidad"))
                .is_some_and(|n| n > 0.0),
            _ => dated_within(r, "fecha_captura", from, to).unwrap_or(true),
        })
        .map(|r| Value::Map(r.data))
        .collect();

    tracing::debug!(kind, branch, rows = rows.len(), "report built");
    Ok(report
        .with_data(record([
            ("cantidad", Value::from(rows.len())),
            ("registros", Value::List(rows)),
        ]))
        .with_status("completado"))
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ReportQueryError> {
    NaiveDate::parse_from_str(value.trim(), QUERY_DATE_FORMAT).map_err(|_| {
        ReportQueryError::BadDate {
            field,
            value: value.to_string(),
        }
    })
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::seconds(1)
}

/// 记录没有分支字段时视为属于查询的分支
fn in_branch(record: &ProcessedRecord, branch: u64) -> bool {
    record
        .number("sucursal_id")
        .is_none_or(|id| id == branch as f64)
}

/// `None` 表示记录没有该日期字段
fn dated_within(
    record: &ProcessedRecord,
    field: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Option<bool> {
    record
        .get(field)
        .and_then(Value::as_timestamp)
        .map(|t| (from..=to).contains(t))
}
