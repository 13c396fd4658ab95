//! 分支数据采集领域层（ingest-domain）
//!
//! 提供数据清洗流水线与事件系统共用的领域构件：
//! - 松散类型值（`value`）：上游字段值的显式和类型 `Value` 与记录 `Record`；
//! - 批次模型（`batch`）：原始批次 `RawBatch` 与处理后记录 `ProcessedRecord`；
//! - 事件（`event`）：不可变事件 `Event`、优先级与已知事件类型；
//! - 事件系统（`eventing`）：总线协议、内存总线、处理器与内置观察者；
//! - 报表（`report`）：报表值对象及其构建器。
//!
//! 本 crate 不绑定任何传输或存储实现，HTTP、持久化等由上层注入。
//!
pub mod batch;
pub mod error;
pub mod event;
#[cfg(feature = "eventing")]
pub mod eventing;
pub mod report;
pub mod value;

pub use batch::{ProcessedRecord, RawBatch, RecordType};
pub use event::{Event, Priority};
pub use value::{Record, Value, record};
