//! 基于 HTTP 的商品信息查询
//!
//! `GET {base}/productos/{sku}`（`sku` 按路径段编码），响应体为 JSON 对象，
//! 其字段直接合并进记录。

use async_trait::async_trait;
use ingest_application::{LookupError, ProductLookup};
use ingest_domain::Record;
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub struct HttpProductLookup {
    http: Client,
    base_url: String,
}

impl HttpProductLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn product_url(&self, sku: &str) -> String {
        format!(
            "{}/productos/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(sku)
        )
    }
}

#[async_trait]
impl ProductLookup for HttpProductLookup {
    async fn lookup(&self, sku: &str) -> Result<Record, LookupError> {
        let resp = self
            .http
            .get(self.product_url(sku))
            .send()
            .await
            .map_err(|e| LookupError::Transport {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound {
                sku: sku.to_string(),
            });
        }
        if !status.is_success() {
            return Err(LookupError::Transport {
                reason: format!("unexpected status {status}"),
            });
        }

        resp.json::<Record>()
            .await
            .map_err(|e| LookupError::InvalidResponse {
                reason: e.to_string(),
            })
    }
}
