//! 商品信息查询（ProductLookup）
//!
//! 富化阶段通过该协议按 SKU 查询外部商品信息；失败只会让记录保持未富化。
//!
use crate::error::LookupError;
use async_trait::async_trait;
use ingest_domain::Record;
use std::collections::HashMap;

/// 缺省的富化来源标签
pub const DEFAULT_ENRICHMENT_SOURCE: &str = "api_externa";

#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// 查询商品信息，返回要合并进记录的字段
    async fn lookup(&self, sku: &str) -> Result<Record, LookupError>;

    /// 写入 `fuente_enriquecimiento` 的来源标签
    fn source_tag(&self) -> &str {
        DEFAULT_ENRICHMENT_SOURCE
    }
}

/// 未配置外部服务时使用：总是返回空结果
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProductLookup;

#[async_trait]
impl ProductLookup for NoopProductLookup {
    async fn lookup(&self, _sku: &str) -> Result<Record, LookupError> {
        Ok(Record::new())
    }
}

/// 基于内存目录的查询实现
#[derive(Debug, Default, Clone)]
pub struct CatalogProductLookup {
    products: HashMap<String, Record>,
    source: String,
}

impl CatalogProductLookup {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            products: HashMap::new(),
            source: source.into(),
        }
    }

    pub fn with_product(mut self, sku: impl Into<String>, info: Record) -> Self {
        self.products.insert(sku.into(), info);
        self
    }
}

#[async_trait]
impl ProductLookup for CatalogProductLookup {
    async fn lookup(&self, sku: &str) -> Result<Record, LookupError> {
        self.products
            .get(sku)
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                sku: sku.to_string(),
            })
    }

    fn source_tag(&self) -> &str {
        &self.source
    }
}
