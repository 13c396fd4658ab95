//! 已知事件类型与事件载荷键
//!
//! 事件类型是可扩展的字符串标签，新增类型无需修改总线。
//! 载荷键沿用既有消费者使用的字段名（origen、tipo、cantidad ...），
//! 以保持互通。

/// 通配订阅：接收所有事件类型
pub const WILDCARD: &str = "*";

pub const DATA_COLLECTED: &str = "datos_recolectados";
pub const DATA_PROCESSED: &str = "datos_procesados";
pub const DATA_PERSISTED: &str = "datos_persistidos";
pub const REPORT_GENERATED: &str = "reporte_generado";
pub const SYNC_COMPLETED: &str = "sincronizacion_completada";
pub const LEAD_CREATED: &str = "cliente_potencial_creado";
pub const SALE_RECORDED: &str = "venta_registrada";
pub const STOCK_UPDATED: &str = "stock_actualizado";

/// 错误事件前缀，具体类型为 `error.<kind>`
pub const ERROR_PREFIX: &str = "error";

/// 构造错误事件类型，例如 `error_type("normalizacion") == "error.normalizacion"`
pub fn error_type(kind: &str) -> String {
    format!("{ERROR_PREFIX}.{kind}")
}

pub fn is_error(event_type: &str) -> bool {
    event_type
        .strip_prefix(ERROR_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// 事件载荷键
pub mod keys {
    pub const ORIGIN: &str = "origen";
    pub const RECORD_TYPE: &str = "tipo";
    pub const COUNT: &str = "cantidad";
    pub const BRANCH_ID: &str = "sucursal_id";
    pub const INITIAL_COUNT: &str = "registros_inicial";
    pub const FINAL_COUNT: &str = "registros_final";
    pub const PERSISTED_COUNT: &str = "registros_persistidos";
    pub const SUCCEEDED_COUNT: &str = "registros_exitosos";
    pub const FAILED_COUNT: &str = "registros_fallidos";
    pub const ERROR_KIND: &str = "tipo_error";
    pub const STAGE: &str = "etapa";
    pub const MESSAGE: &str = "mensaje";
    pub const REPORT_ID: &str = "reporte_id";
    pub const BATCH_ID: &str = "lote_id";
}
