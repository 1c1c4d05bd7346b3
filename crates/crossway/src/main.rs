use crossway::{CrosswayServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), crossway::CrosswayError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let server = CrosswayServer::bind(config).await?;
    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, "crossway server listening");
    }
    server.run().await
}
