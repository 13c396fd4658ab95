//! 服务配置
//!
//! 从环境变量读取（启动时先加载 `.env`）。所有变量均有缺省值。

use ingest_application::ProcessorConfig;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// 商品信息服务地址；未设置时不做外部富化
    pub product_api_url: Option<String>,
    pub lookup_timeout: Duration,
    pub processor: ProcessorConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 以任意变量来源构建配置
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ProcessorConfig::default();
        let processor = ProcessorConfig {
            enrich_concurrency: parse_or(
                &get,
                "INGEST_ENRICH_CONCURRENCY",
                defaults.enrich_concurrency,
            )?,
            persist_concurrency: parse_or(
                &get,
                "INGEST_PERSIST_CONCURRENCY",
                defaults.persist_concurrency,
            )?,
            ..defaults
        };

        Ok(Self {
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            product_api_url: get("INGEST_PRODUCT_API_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            lookup_timeout: Duration::from_millis(parse_or(
                &get,
                "INGEST_LOOKUP_TIMEOUT_MS",
                DEFAULT_LOOKUP_TIMEOUT_MS,
            )?),
            processor,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_or<F, T>(get: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.product_api_url, None);
        assert_eq!(cfg.lookup_timeout, Duration::from_secs(5));
        assert_eq!(cfg.processor.enrich_concurrency, 4);
        assert_eq!(cfg.processor.source, "procesador_datos");
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("PORT", "3000"),
            ("INGEST_PRODUCT_API_URL", "http://catalogo.local/api/"),
            ("INGEST_LOOKUP_TIMEOUT_MS", "250"),
            ("INGEST_PERSIST_CONCURRENCY", " 16 "),
        ])
        .unwrap();

        assert_eq!(cfg.listen_addr().port(), 3000);
        assert_eq!(
            cfg.product_api_url.as_deref(),
            Some("http://catalogo.local/api")
        );
        assert_eq!(cfg.lookup_timeout, Duration::from_millis(250));
        assert_eq!(cfg.processor.persist_concurrency, 16);
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = config(&[("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
        assert!(config(&[("INGEST_PRODUCT_API_URL", "  ")]).unwrap().product_api_url.is_none());
    }
}
