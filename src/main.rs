use std::sync::Arc;

use anyhow::anyhow;
use tokio::net::TcpListener;
use tracing::info;

use cotacao::app;
use cotacao::config::ServerConfig;
use cotacao::external::awesomeapi::AwesomeApiProvider;
use cotacao::logging::{init_logging, LoggingConfig};
use cotacao::state::AppState;
use cotacao::store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env("cotacao-server")).map_err(|e| anyhow!(e))?;

    let config = ServerConfig::from_env()?;

    // Schema assurance happens here, once, not per request.
    let store = store::connect(&config.database).await?;
    let provider = AwesomeApiProvider::from_config(&config)?;
    info!(
        upstream = provider.endpoint(),
        request_ms = config.request_timeout.as_millis() as u64,
        upstream_ms = config.upstream_timeout.as_millis() as u64,
        db_ms = config.db_timeout.as_millis() as u64,
        "Deadlines configured"
    );

    let addr = config.bind_addr;
    let state = AppState {
        config: Arc::new(config),
        quote_provider: Arc::new(provider),
        store,
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(addr).await?;
    info!("Server started at http://{}/cotacao", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
