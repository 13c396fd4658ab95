//! 流水线阶段
//!
//! 每个阶段都是独立的函数，输入输出为记录序列，由 `BatchProcessor` 串联。
//! 只有归一化在批次为空时会失败，其余阶段对单条记录的问题均为非致命。
//!
pub mod deduplicate;
pub mod enrich;
pub mod normalize;
pub mod persist;
pub mod validate;

pub use deduplicate::{deduplicate, uniqueness_key};
pub use enrich::enrich;
pub use normalize::{normalize, normalize_record};
pub use persist::{PersistReport, persist};
pub use validate::{check, validate};
