//! 报表（Report）
//!
//! 报表是一个简单的值对象，通过 `Report::builder()` 装配：
//! - `kind`（报表类型）必填且不能为空；
//! - `format` 缺省为 `excel`，`status` 缺省为 `pendiente`；
//! - `id` 自动生成为 `reporte_<kind>_<unix 秒>`。
//!
//! 另提供三个常用预设：分支销售、当前库存、潜在客户。
//!
use crate::error::{DomainError, DomainResult};
use crate::value::{Record, Value};
use bon::bon;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FORMAT: &str = "excel";
pub const DEFAULT_STATUS: &str = "pendiente";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    id: String,
    #[serde(rename = "tipo")]
    kind: String,
    #[serde(rename = "fecha_inicio")]
    from: Option<DateTime<Utc>>,
    #[serde(rename = "fecha_fin")]
    to: Option<DateTime<Utc>>,
    #[serde(rename = "sucursal_id")]
    branch_id: Option<u64>,
    #[serde(rename = "formato")]
    format: String,
    #[serde(rename = "datos")]
    data: Record,
    #[serde(rename = "filtros")]
    filters: Vec<String>,
    #[serde(rename = "ordenamiento")]
    ordering: Option<String>,
    #[serde(rename = "generado_en")]
    generated_at: DateTime<Utc>,
    #[serde(rename = "estado")]
    status: String,
}

#[bon]
impl Report {
    #[builder]
    pub fn new(
        #[builder(into)] kind: String,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        branch_id: Option<u64>,
        #[builder(into)] format: Option<String>,
        #[builder(default)] data: Record,
        #[builder(default)] filters: Vec<String>,
        #[builder(into)] ordering: Option<String>,
        #[builder(into)] status: Option<String>,
    ) -> DomainResult<Self> {
        if kind.trim().is_empty() {
            return Err(DomainError::invalid_value("report kind is required"));
        }
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(DomainError::invalid_value(format!(
                    "report range is inverted: {from} > {to}"
                )));
            }
        }

        let generated_at = Utc::now();
        Ok(Self {
            id: format!("reporte_{kind}_{}", generated_at.timestamp()),
            kind,
            from,
            to,
            branch_id,
            format: format.unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            data,
            filters,
            ordering,
            generated_at,
            status: status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        })
    }
}

impl Report {
    /// 分支销售报表（仅已完成的销售，按销售日期倒序）
    pub fn sales_by_branch(
        branch_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Report::builder()
            .kind("ventas_por_sucursal")
            .branch_id(branch_id)
            .from(from)
            .to(to)
            .format(DEFAULT_FORMAT)
            .filters(vec!["estado=completada".to_string()])
            .ordering("fecha_venta DESC")
            .build()
    }

    /// 当前库存报表（仅有库存的商品，按库存升序）
    pub fn current_stock(branch_id: u64) -> DomainResult<Self> {
        Report::builder()
            .kind("stock_actual")
            .branch_id(branch_id)
            .format(DEFAULT_FORMAT)
            .filters(vec!["stock_actual > 0".to_string()])
            .ordering("stock_actual ASC")
            .build()
    }

    /// 潜在客户报表（仅活跃客户，按采集日期倒序）
    pub fn potential_clients(
        branch_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Report::builder()
            .kind("clientes_potenciales")
            .branch_id(branch_id)
            .from(from)
            .to(to)
            .format(DEFAULT_FORMAT)
            .filters(vec!["estado=activo".to_string()])
            .ordering("fecha_captura DESC")
            .build()
    }

    /// 填入报表内容（预设只描述查询条件，内容由调用方汇总）
    pub fn with_data(mut self, data: Record) -> Self {
        self.data = data;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn range(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (self.from, self.to)
    }

    pub fn branch_id(&self) -> Option<u64> {
        self.branch_id
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn data(&self) -> &Record {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&str> {
        self.ordering.as_deref()
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::record;
    use chrono::TimeZone;

    #[test]
    fn applies_defaults() {
        let report = Report::builder()
            .kind("reporte_procesamiento")
            .data(record([("registros_final", 3_i64)]))
            .build()
            .unwrap();

        assert_eq!(report.format(), "excel");
        assert_eq!(report.status(), "pendiente");
        assert!(report.id().starts_with("reporte_reporte_procesamiento_"));
        assert_eq!(report.get("registros_final"), Some(&Value::Integer(3)));
        assert!(report.filters().is_empty());
    }

    #[test]
    fn kind_is_required() {
        let err = Report::builder().kind("  ").build().unwrap_err();
        assert!(matches!(err, DomainError::InvalidValue { .. }));
    }

    #[test]
    fn sales_preset() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 59).unwrap();
        let report = Report::sales_by_branch(1, from, to).unwrap();

        assert_eq!(report.kind(), "ventas_por_sucursal");
        assert_eq!(report.branch_id(), Some(1));
        assert_eq!(report.range(), (Some(from), Some(to)));
        assert_eq!(report.filters(), ["estado=completada".to_string()]);
        assert_eq!(report.ordering(), Some("fecha_venta DESC"));

        assert!(Report::sales_by_branch(1, to, from).is_err());
    }

    #[test]
    fn stock_and_clients_presets() {
        let stock = Report::current_stock(2).unwrap();
        assert_eq!(stock.ordering(), Some("stock_actual ASC"));

        let now = Utc::now();
        let clients = Report::potential_clients(2, now, now).unwrap();
        assert_eq!(clients.filters(), ["estado=activo".to_string()]);
    }

    #[test]
    fn preset_is_filled_after_building() {
        let report = Report::current_stock(4)
            .unwrap()
            .with_data(record([("cantidad", 2_i64)]))
            .with_status("completado");

        assert_eq!(report.get("cantidad"), Some(&Value::Integer(2)));
        assert_eq!(report.status(), "completado");
        assert_eq!(report.kind(), "stock_actual");
    }
}
