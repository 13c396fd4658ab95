/// 流水线配置
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    /// 发布事件时使用的来源标识
    pub source: String,
    /// 富化阶段对商品查询的并发上限（阶段内保持记录顺序）
    pub enrich_concurrency: usize,
    /// 持久化阶段的并发上限
    pub persist_concurrency: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            source: "procesador_datos".to_string(),
            enrich_concurrency: 4,
            persist_concurrency: 4,
        }
    }
}
