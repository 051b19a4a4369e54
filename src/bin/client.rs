use anyhow::anyhow;
use tracing::{error, info};

use cotacao::client;
use cotacao::config::ClientConfig;
use cotacao::logging::{init_logging, LoggingConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging(LoggingConfig::from_env("cotacao-client")).map_err(|e| anyhow!(e))?;

    let config = ClientConfig::from_env()?;

    match client::run(&config).await {
        Ok(content) => {
            info!(path = %config.output_path.display(), %content, "Arquivo com a cotação do dólar criado com sucesso!");
            Ok(())
        }
        Err(e) => {
            error!("Client failed: {}", e);
            Err(e.into())
        }
    }
}
