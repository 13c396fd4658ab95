//! 分支数据采集服务
//!
//! 接收各分支上报的原始批次，经清洗流水线处理后保存，并通过事件总线
//! 通知日志、计数与报表等观察者。

mod api;
mod config;
mod lookup;
mod observers;
mod report_query;
mod server;
mod shutdown;
mod state;

use config::ServerConfig;
use server::{build_router, run_server};
use state::AppState;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` 不存在时忽略
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Starting ingest-server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let listen_addr = config.listen_addr();

    let state = AppState::from_config(&config)?;
    let router = build_router(state);

    run_server(router, listen_addr).await?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ingest::audit=info,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
